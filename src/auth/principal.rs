//! Authenticated principals and the accessor that resolves the current one.

// self
use crate::{_prelude::*, auth::SubjectId};

/// Authenticated identity on whose behalf user tokens are managed.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Principal {
	/// Stable subject claim; keys the user token store.
	pub subject: SubjectId,
	/// Optional display name claim, preferred in log fields.
	pub name: Option<String>,
}
impl Principal {
	/// Creates a principal for the provided subject.
	pub fn new(subject: SubjectId) -> Self {
		Self { subject, name: None }
	}

	/// Attaches a display name.
	pub fn with_name(mut self, name: impl Into<String>) -> Self {
		self.name = Some(name.into());

		self
	}

	/// Name used in log fields: the display name when present, otherwise the subject.
	pub fn display_name(&self) -> &str {
		self.name.as_deref().filter(|name| !name.is_empty()).unwrap_or(self.subject.as_str())
	}
}

/// Resolves the principal bound to the current call context.
///
/// `None` means the caller is not authenticated; user flows then fail with
/// [`FailureKind::Unauthenticated`](crate::flows::FailureKind::Unauthenticated) without logging
/// an error.
pub trait PrincipalAccessor
where
	Self: Send + Sync,
{
	/// Returns the current authenticated principal, if any.
	fn current_principal(&self) -> Option<Principal>;
}
impl<F> PrincipalAccessor for F
where
	F: Send + Sync + Fn() -> Option<Principal>,
{
	fn current_principal(&self) -> Option<Principal> {
		self()
	}
}
