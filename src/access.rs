//! Menu/permission access models, canonical wire schemas, and cache freshness.
//!
//! Each backend endpoint has exactly one canonical serde schema here; responses
//! that do not match fail with a typed parse error instead of being probed for
//! alternate shapes.

// self
use crate::{
	_prelude::*,
	auth::{BillingStatus, UserId},
};

/// Single navigable menu entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
	/// Stable menu item code.
	pub code: String,
	/// Display name.
	pub name: String,
	/// Route or URL the item links to.
	pub url: String,
	/// Optional icon identifier.
	pub icon: Option<String>,
	/// Permission code required to use the item, if any.
	pub permission: Option<String>,
	/// Whether the item is currently enabled.
	pub active: bool,
}

/// Ordered group of menu items.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuGroup {
	/// Stable group code.
	pub code: String,
	/// Display name.
	pub name: String,
	/// Ordered items belonging to the group.
	pub items: Vec<MenuItem>,
}

/// Resolved access triple exposed to the console shell.
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AccessSnapshot {
	/// Ordered menu groups the user may see.
	pub menu: Vec<MenuGroup>,
	/// Flat permission-code list.
	pub permissions: Vec<String>,
	/// Flat role-code list.
	pub roles: Vec<String>,
}

/// Tab-scoped cache entry owning a resolved snapshot.
#[derive(Clone, Debug)]
pub struct AccessCacheEntry {
	/// User the snapshot was resolved for.
	pub user: UserId,
	/// Instant the snapshot was fetched.
	pub fetched_at: OffsetDateTime,
	/// Cached snapshot.
	pub snapshot: AccessSnapshot,
}
impl AccessCacheEntry {
	/// Whether the entry may be served for `user` at `now` under the given TTL.
	pub fn is_fresh(&self, user: &UserId, now: OffsetDateTime, ttl: Duration) -> bool {
		self.user == *user && now - self.fetched_at < ttl
	}
}

/// Outcome of an access resolution attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AccessOutcome {
	/// Access resolved (served fresh or from cache).
	Granted(AccessSnapshot),
	/// No authenticated user, or the backend answered 401; no error surfaced.
	Unauthenticated,
	/// The backend answered 403: a genuine denial. The UI shows a blocking
	/// denial screen with a retry action instead of redirecting silently.
	Denied,
	/// Backend reachable but the access call failed (subscription/billing);
	/// the snapshot is the minimal hardcoded menu.
	SubscriptionLimited(AccessSnapshot),
	/// Backend unreachable; the session was forcibly terminated.
	SessionRevoked,
}

/// Canonical schema for the current-access endpoint.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentAccessWire {
	/// Flat permission-code list.
	pub permissions: Vec<String>,
	/// Flat role-code list.
	pub roles: Vec<String>,
}

/// Canonical schema for one menu item on the wire.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItemWire {
	/// Stable menu item code.
	pub code: String,
	/// Display name.
	pub name: String,
	/// Route or URL the item links to.
	pub url: String,
	/// Optional icon identifier.
	#[serde(default)]
	pub icon: Option<String>,
	/// Permission code required to use the item.
	#[serde(default)]
	pub permission: Option<String>,
	/// Whether the item is currently enabled.
	#[serde(default = "default_active")]
	pub is_active: bool,
}

/// Canonical schema for one menu group on the wire (menu tree and role-scoped
/// menu endpoints share this shape).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuGroupWire {
	/// Stable group code.
	pub code: String,
	/// Display name.
	pub name: String,
	/// Ordered items belonging to the group.
	pub items: Vec<MenuItemWire>,
}

/// Canonical schema for one catalog entry: a menu item tagged with its group.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuCatalogItemWire {
	/// Code of the group the item belongs to.
	pub group_code: String,
	/// Name of the group the item belongs to.
	pub group_name: String,
	/// The item itself.
	#[serde(flatten)]
	pub item: MenuItemWire,
}

/// Canonical schema for the legacy per-user role-menu lookup: granted item codes.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantedMenuWire {
	/// Menu item codes the user's role grants.
	pub item_codes: Vec<String>,
}

/// Canonical schema for the liveness endpoint.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HealthWire {
	/// Reported backend status.
	pub status: String,
}
impl HealthWire {
	/// Whether the backend reports itself healthy.
	pub fn is_healthy(&self) -> bool {
		matches!(self.status.to_ascii_lowercase().as_str(), "ok" | "healthy" | "up")
	}
}

fn default_active() -> bool {
	true
}

impl From<MenuItemWire> for MenuItem {
	fn from(wire: MenuItemWire) -> Self {
		Self {
			code: wire.code,
			name: wire.name,
			url: wire.url,
			icon: wire.icon,
			permission: wire.permission,
			active: wire.is_active,
		}
	}
}
impl From<MenuGroupWire> for MenuGroup {
	fn from(wire: MenuGroupWire) -> Self {
		Self {
			code: wire.code,
			name: wire.name,
			items: wire.items.into_iter().map(MenuItem::from).collect(),
		}
	}
}

/// Normalizes wire menu groups into the domain model, preserving order.
pub fn normalize_groups(groups: Vec<MenuGroupWire>) -> Vec<MenuGroup> {
	groups.into_iter().map(MenuGroup::from).collect()
}

/// Joins the legacy granted-item-code list against the flat menu catalog.
///
/// Groups come out in catalog order and only contain granted items; groups with
/// no granted item are omitted.
pub fn join_catalog(catalog: Vec<MenuCatalogItemWire>, granted: &[String]) -> Vec<MenuGroup> {
	let mut groups: Vec<MenuGroup> = Vec::new();

	for entry in catalog {
		if !granted.contains(&entry.item.code) {
			continue;
		}

		match groups.iter_mut().find(|group| group.code == entry.group_code) {
			Some(group) => group.items.push(entry.item.into()),
			None => groups.push(MenuGroup {
				code: entry.group_code,
				name: entry.group_name,
				items: vec![entry.item.into()],
			}),
		}
	}

	groups
}

/// Builds the minimal fallback snapshot used when access resolution degrades.
///
/// Always contains the account group (profile + change-password); a
/// subscription-management entry is added when billing is inactive or overdue.
pub fn minimal_snapshot(billing: BillingStatus) -> AccessSnapshot {
	let mut items = vec![
		MenuItem {
			code: "profile".into(),
			name: "Profile".into(),
			url: "/account/profile".into(),
			icon: Some("user".into()),
			permission: None,
			active: true,
		},
		MenuItem {
			code: "change-password".into(),
			name: "Change Password".into(),
			url: "/account/change-password".into(),
			icon: Some("lock".into()),
			permission: None,
			active: true,
		},
	];

	if billing.is_delinquent() {
		items.push(MenuItem {
			code: "subscription".into(),
			name: "Subscription".into(),
			url: "/account/subscription".into(),
			icon: Some("credit-card".into()),
			permission: None,
			active: true,
		});
	}

	AccessSnapshot {
		menu: vec![MenuGroup { code: "account".into(), name: "Account".into(), items }],
		permissions: Vec::new(),
		roles: Vec::new(),
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	fn wire_item(code: &str) -> MenuItemWire {
		MenuItemWire {
			code: code.into(),
			name: code.to_uppercase(),
			url: format!("/{code}"),
			icon: None,
			permission: None,
			is_active: true,
		}
	}

	#[test]
	fn cache_entry_freshness_requires_owner_and_ttl() {
		let owner = UserId::new("user-1").expect("Owner fixture should be valid.");
		let other = UserId::new("user-2").expect("Other-user fixture should be valid.");
		let fetched = macros::datetime!(2025-01-01 00:00 UTC);
		let entry = AccessCacheEntry {
			user: owner.clone(),
			fetched_at: fetched,
			snapshot: AccessSnapshot::default(),
		};
		let ttl = Duration::minutes(15);

		assert!(entry.is_fresh(&owner, fetched + Duration::minutes(14), ttl));
		assert!(!entry.is_fresh(&owner, fetched + Duration::minutes(15), ttl));
		assert!(!entry.is_fresh(&other, fetched + Duration::minutes(1), ttl));
	}

	#[test]
	fn catalog_join_groups_granted_items_in_catalog_order() {
		let catalog = vec![
			MenuCatalogItemWire {
				group_code: "crm".into(),
				group_name: "CRM".into(),
				item: wire_item("contacts"),
			},
			MenuCatalogItemWire {
				group_code: "crm".into(),
				group_name: "CRM".into(),
				item: wire_item("deals"),
			},
			MenuCatalogItemWire {
				group_code: "chat".into(),
				group_name: "Chat".into(),
				item: wire_item("inbox"),
			},
		];
		let granted = vec!["inbox".to_string(), "contacts".to_string()];
		let groups = join_catalog(catalog, &granted);

		assert_eq!(groups.len(), 2);
		assert_eq!(groups[0].code, "crm");
		assert_eq!(groups[0].items.len(), 1);
		assert_eq!(groups[0].items[0].code, "contacts");
		assert_eq!(groups[1].code, "chat");
		assert_eq!(groups[1].items[0].code, "inbox");
	}

	#[test]
	fn minimal_snapshot_adds_subscription_entry_when_delinquent() {
		let healthy = minimal_snapshot(BillingStatus::Active);
		let codes = |snapshot: &AccessSnapshot| {
			snapshot.menu[0].items.iter().map(|item| item.code.clone()).collect::<Vec<_>>()
		};

		assert_eq!(codes(&healthy), vec!["profile", "change-password"]);

		let overdue = minimal_snapshot(BillingStatus::Overdue);

		assert_eq!(codes(&overdue), vec!["profile", "change-password", "subscription"]);
	}

	#[test]
	fn wire_items_default_missing_flags() {
		let parsed: MenuItemWire =
			serde_json::from_str(r#"{"code":"inbox","name":"Inbox","url":"/inbox"}"#)
				.expect("Minimal wire item should deserialize.");

		assert!(parsed.is_active);
		assert!(parsed.icon.is_none());

		let item = MenuItem::from(parsed);

		assert!(item.active);
	}

	#[test]
	fn health_envelope_recognizes_common_statuses() {
		for status in ["ok", "OK", "healthy", "up"] {
			assert!(HealthWire { status: status.into() }.is_healthy(), "{status} should be healthy");
		}

		assert!(!HealthWire { status: "degraded".into() }.is_healthy());
	}
}
