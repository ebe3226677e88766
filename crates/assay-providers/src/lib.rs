//! assay-providers: Search and completion provider implementations for assay
//!
//! This crate provides implementations of the `SearchProvider` and
//! `CompletionProvider` traits for the hosted services assay talks to.

pub mod chat;
pub mod tavily;

pub use chat::ChatCompletionsProvider;
pub use tavily::TavilySearch;

use assay_core::ProviderFault;

/// Map a transport-level reqwest failure to a provider fault.
pub(crate) fn transport_fault(err: reqwest::Error) -> ProviderFault {
    if err.is_timeout() {
        ProviderFault::Timeout(err.to_string())
    } else if err.is_decode() {
        ProviderFault::malformed(err.to_string())
    } else {
        ProviderFault::network(err.to_string())
    }
}
