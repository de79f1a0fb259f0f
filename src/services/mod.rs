// Business operations. Each is a free async function over `AppState` so the
// HTTP layer stays a thin translation of requests into calls.

pub mod billing;
pub mod feed;
pub mod highlights;
pub mod identity;
pub mod moderation;
pub mod notifications;
pub mod posts;
pub mod social_graph;
pub mod verification;
