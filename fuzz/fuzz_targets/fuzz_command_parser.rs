//! Fuzz target: `CommandParser::feed`
//!
//! Splits the input into bursts at arbitrary points and drives them into
//! the serial command parser.  Each burst must end with exactly one
//! `Idle`/`Waiting`, and text payloads must fit the frame limit.
//!
//! cargo fuzz run fuzz_command_parser

#![no_main]

use energino::app::commands::Command;
use energino::protocol::parser::{CommandParser, FrameOutcome, MAX_FRAME};
use energino::settings::RawValue;
use libfuzzer_sys::fuzz_target;

fn check_burst(parser: &mut CommandParser, burst: &[u8]) {
    let mut markers = 0;
    let mut last_was_marker = false;
    parser.feed(burst, |outcome| {
        last_was_marker = matches!(outcome, FrameOutcome::Idle | FrameOutcome::Waiting);
        if last_was_marker {
            markers += 1;
        }
        if let FrameOutcome::Command(Command::Set(_, RawValue::Text(s))) = &outcome {
            assert!(s.len() <= MAX_FRAME - 2, "payload exceeds frame limit");
        }
    });
    assert_eq!(markers, 1, "burst must end with one Idle/Waiting");
    assert!(last_was_marker, "marker must be the final outcome");
}

fuzz_target!(|data: &[u8]| {
    // First byte picks the burst length.
    let Some((&split, rest)) = data.split_first() else {
        return;
    };
    let chunk = usize::from(split).max(1);

    let mut parser = CommandParser::new();
    for burst in rest.chunks(chunk) {
        check_burst(&mut parser, burst);
    }

    // After a reset the parser must accept the whole input as one burst.
    parser.reset();
    assert!(!parser.is_waiting());
    check_burst(&mut parser, rest);
});
