use usersync_access::ValidatedOrigin;

/// Origin context for a request.
///
/// Inserted by the origin gate; present on every gated route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginContext {
    origin: ValidatedOrigin,
}

impl OriginContext {
    pub fn new(origin: ValidatedOrigin) -> Self {
        Self { origin }
    }

    pub fn origin(&self) -> &ValidatedOrigin {
        &self.origin
    }
}
