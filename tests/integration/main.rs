//! Integration tests: refresh pipeline, consultations, and HTTP clients.

mod http_clients;
mod mocks;
mod pipeline;
