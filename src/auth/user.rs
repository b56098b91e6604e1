//! Authenticated user model and session-kind classification.

// self
use crate::{
	_prelude::*,
	auth::{RoleId, TenantCode, UserId},
};

/// Billing standing of the tenant the user belongs to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingStatus {
	#[default]
	/// Subscription is in good standing.
	Active,
	/// Subscription has been deactivated.
	Inactive,
	/// Payment is overdue.
	Overdue,
}
impl BillingStatus {
	/// Returns `true` when the minimal menu should include a subscription entry.
	pub fn is_delinquent(self) -> bool {
		matches!(self, Self::Inactive | Self::Overdue)
	}
}

/// Authenticated console user as cached alongside the session credentials.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
	/// Unique user identifier; owns the access cache entry.
	pub id: UserId,
	/// Display name rendered by the console shell.
	pub display_name: String,
	/// Ordered role codes; the first element is the primary role.
	pub roles: Vec<String>,
	/// Numeric role identifier used for role-scoped menu access, when assigned.
	pub role_id: Option<RoleId>,
	/// Tenant the user belongs to; absent for platform-level accounts.
	pub tenant_code: Option<TenantCode>,
	/// Billing standing driving the degraded-menu subscription entry.
	#[serde(default)]
	pub billing: BillingStatus,
}
impl AuthUser {
	/// Returns the primary role code, if any role has been assigned.
	pub fn primary_role(&self) -> Option<&str> {
		self.roles.first().map(String::as_str)
	}

	/// Whether the user follows the admin (full-access) authorization path.
	///
	/// Matching is case-insensitive against the descriptor's admin role set.
	pub fn is_admin(&self, admin_roles: &[String]) -> bool {
		self.roles
			.iter()
			.any(|role| admin_roles.iter().any(|admin| role.eq_ignore_ascii_case(admin)))
	}
}

/// Session context derived from stored credentials and the cached user's roles.
///
/// The kind is never passed as a parameter: refresh may be triggered transparently
/// mid-request, so the coordinator re-derives it from what is actually stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SessionKind {
	/// Platform-level administrator session.
	Platform,
	/// Tenant administrator session.
	TenantAdmin,
	/// Tenant member session (role-scoped access).
	TenantMember,
}
impl SessionKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			SessionKind::Platform => "platform",
			SessionKind::TenantAdmin => "tenant_admin",
			SessionKind::TenantMember => "tenant_member",
		}
	}
}
impl Display for SessionKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn user(roles: &[&str]) -> AuthUser {
		AuthUser {
			id: UserId::new("user-1").expect("User fixture should be valid."),
			display_name: "Ada".into(),
			roles: roles.iter().map(|r| r.to_string()).collect(),
			role_id: None,
			tenant_code: None,
			billing: BillingStatus::Active,
		}
	}

	#[test]
	fn admin_detection_is_case_insensitive() {
		let admin_roles = vec!["admin".to_string(), "owner".to_string()];

		assert!(user(&["Admin", "sales"]).is_admin(&admin_roles));
		assert!(user(&["sales", "OWNER"]).is_admin(&admin_roles));
		assert!(!user(&["sales", "support"]).is_admin(&admin_roles));
		assert!(!user(&[]).is_admin(&admin_roles));
	}

	#[test]
	fn primary_role_is_first_element() {
		assert_eq!(user(&["sales", "support"]).primary_role(), Some("sales"));
		assert_eq!(user(&[]).primary_role(), None);
	}

	#[test]
	fn billing_delinquency_covers_inactive_and_overdue() {
		assert!(!BillingStatus::Active.is_delinquent());
		assert!(BillingStatus::Inactive.is_delinquent());
		assert!(BillingStatus::Overdue.is_delinquent());
	}

	#[test]
	fn user_deserializes_without_billing_field() {
		let parsed: AuthUser = serde_json::from_str(
			r#"{"id":"user-9","display_name":"Kim","roles":["member"],"role_id":7,"tenant_code":"acme"}"#,
		)
		.expect("User without billing field should deserialize.");

		assert_eq!(parsed.billing, BillingStatus::Active);
		assert_eq!(parsed.role_id, Some(RoleId(7)));
	}
}
