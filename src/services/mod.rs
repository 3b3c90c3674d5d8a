// ABOUTME: Domain services for the portal; each takes its collaborators explicitly at construction
// ABOUTME: Handlers call these and only translate results into response envelopes

pub mod access;
pub mod activities;
pub mod certificates;
pub mod portfolio;
pub mod resources;
pub mod users;

pub use access::AccessTracker;
pub use activities::ActivityService;
pub use certificates::CertificateService;
pub use portfolio::PortfolioAggregator;
pub use resources::ResourceService;
pub use users::{Actor, UserDirectory};

/// Trims a form value and treats blank input as absent.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
