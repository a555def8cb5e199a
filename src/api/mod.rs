//! API layer - HTTP endpoint handlers organized by domain.

mod batch;
mod health;
mod metrics;
mod proxy;
mod routes;
mod template;
mod workspace;

pub use batch::{batch_report, batch_template, cancel_batch, import_csv, run_batch};
pub use health::health;
pub use metrics::prometheus_metrics;
pub use proxy::proxy;
pub use routes::api_routes;
pub use template::{
    format_template, substitute_template, template_field_paths, template_highlights,
    template_placeholders, validate_template,
};
pub use workspace::{
    create_workspace, delete_workspace, dispatch_actions, get_workspace, list_workspaces,
    send_workspace,
};
