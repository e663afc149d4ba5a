use reqwest::RequestBuilder;

/// Credential attached to a single outbound request.
///
/// Every call into `ApiClient` takes one of these explicitly; there is no
/// client-wide default `Authorization` header to mutate. The session manager
/// hands out a fresh context reflecting its current token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    bearer: Option<String>,
}

impl RequestContext {
    /// A context that sends no credential
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// A context carrying `token` as a bearer credential. Empty tokens are dropped.
    pub fn with_bearer(token: impl Into<String>) -> Self {
        let token = token.into();
        Self {
            bearer: (!token.is_empty()).then_some(token),
        }
    }

    pub fn bearer(&self) -> Option<&str> {
        self.bearer.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.bearer.is_some()
    }

    pub(crate) fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        match self.bearer {
            Some(ref token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_token_is_anonymous() {
        assert_eq!(RequestContext::with_bearer(""), RequestContext::anonymous());
        assert!(!RequestContext::anonymous().is_authenticated());
    }

    #[test]
    fn test_bearer_round_trip() {
        let ctx = RequestContext::with_bearer("abc.def");
        assert_eq!(ctx.bearer(), Some("abc.def"));
        assert!(ctx.is_authenticated());
    }
}
