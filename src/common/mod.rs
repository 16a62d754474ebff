pub mod auth;
pub mod compression;
pub mod config;
pub mod cookies;
pub mod http;
pub mod tls;

pub use auth::{Credentials, Password};
pub use compression::{ContentEncoding, add_accept_encoding, decompress_body, detect_encodings};
pub use config::TransportConfig;
pub use cookies::CookieJar;
pub use http::{HyperClient, RawResponse, Transport, TransportBuilder, build_hyper_client};
pub use tls::{AcceptedCertificates, CertificateTrust, RejectUntrusted};
