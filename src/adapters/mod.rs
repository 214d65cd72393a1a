//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter        | Implements         | Connects to                |
//! |----------------|--------------------|----------------------------|
//! | `hardware`     | AnalogPort         | ESP32 ADC1                 |
//! |                | RelayPort          | Relay GPIO                 |
//! | `log_sink`     | EventSink          | Log output                 |
//! | `serial`       | EventSink          | Console UART line protocol |
//! | `nvs`          | StoragePort        | NVS / in-memory store      |
//! | `feed_client`  | FeedPort           | Remote feed over TCP       |
//! | `http_server`  | (polled by main)   | HTTP datastreams listener  |
//! | `time`         | (clock)            | ESP32 system timer         |

pub mod feed_client;
pub mod hardware;
pub mod http_server;
pub mod log_sink;
pub mod nvs;
pub mod serial;
pub mod time;
