/// Router Module Index
///
/// The gate API has a single public surface. Viewer resolution happens per request in
/// the `Viewer` extractor, which never rejects, so no authentication layer is applied
/// at the router level; handlers that need a signed-in viewer answer 401 themselves.

/// Routes accessible to every caller (anonymous or signed in).
pub mod public;
