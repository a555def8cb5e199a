//! Request workspaces: explicit editor state driven by a pure reducer.

mod state;
mod store;

pub use state::{
    reduce, send, set_alias, toggle_field, ApiResponse, WorkspaceAction, WorkspaceState,
    DEFAULT_BODY, DEFAULT_ENDPOINT, DEFAULT_METHOD,
};
pub use store::{
    create_workspace_store, CreateWorkspaceRequest, WorkspaceError, WorkspaceResult,
    WorkspaceStore,
};
