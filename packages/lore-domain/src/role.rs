use serde::{Deserialize, Serialize};

/// Membership roles over a workspace. The total order is carried by [`Role::rank`], never by
/// declaration order.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
	Read,
	Write,
	Admin,
	Owner,
}
impl Role {
	pub fn rank(self) -> u8 {
		match self {
			Self::Read => 0,
			Self::Write => 1,
			Self::Admin => 2,
			Self::Owner => 3,
		}
	}

	pub fn satisfies(self, min_role: Role) -> bool {
		self.rank() >= min_role.rank()
	}

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Read => "read",
			Self::Write => "write",
			Self::Admin => "admin",
			Self::Owner => "owner",
		}
	}

	pub fn parse(raw: &str) -> Option<Self> {
		match raw {
			"read" => Some(Self::Read),
			"write" => Some(Self::Write),
			"admin" => Some(Self::Admin),
			"owner" => Some(Self::Owner),
			_ => None,
		}
	}
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
	Public,
	Private,
}
impl Visibility {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Public => "public",
			Self::Private => "private",
		}
	}

	pub fn parse(raw: &str) -> Option<Self> {
		match raw {
			"public" => Some(Self::Public),
			"private" => Some(Self::Private),
			_ => None,
		}
	}
}
