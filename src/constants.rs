use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Manager,
    User,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Admin, Role::Manager, Role::User];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::User => "user",
        }
    }

    pub fn permissions(self) -> &'static [Permission] {
        match self {
            Role::Admin => ADMIN_PERMISSIONS,
            Role::Manager => MANAGER_PERMISSIONS,
            Role::User => USER_PERMISSIONS,
        }
    }

    pub fn has_permission(self, permission: Permission) -> bool {
        self.permissions().contains(&permission)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "manager" => Ok(Role::Manager),
            "user" => Ok(Role::User),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    ViewAssets,
    ManageAssets,
    DeleteAssets,
    ViewEmployees,
    ManageEmployees,
    ManageAssignments,
    ImportData,
    ExportData,
    ViewReports,
    ManageUsers,
    ViewActivityLog,
    ManageSettings,
}

const ADMIN_PERMISSIONS: &[Permission] = &[
    Permission::ViewAssets,
    Permission::ManageAssets,
    Permission::DeleteAssets,
    Permission::ViewEmployees,
    Permission::ManageEmployees,
    Permission::ManageAssignments,
    Permission::ImportData,
    Permission::ExportData,
    Permission::ViewReports,
    Permission::ManageUsers,
    Permission::ViewActivityLog,
    Permission::ManageSettings,
];

const MANAGER_PERMISSIONS: &[Permission] = &[
    Permission::ViewAssets,
    Permission::ManageAssets,
    Permission::ViewEmployees,
    Permission::ManageEmployees,
    Permission::ManageAssignments,
    Permission::ImportData,
    Permission::ExportData,
    Permission::ViewReports,
];

const USER_PERMISSIONS: &[Permission] = &[
    Permission::ViewAssets,
    Permission::ViewEmployees,
    Permission::ExportData,
];

pub const ROLES: &[&str] = &["admin", "manager", "user"];

pub const EMPLOYEE_STATUSES: &[&str] = &["active", "inactive", "on_leave", "terminated"];

pub const HARDWARE_STATUSES: &[&str] = &["available", "assigned", "maintenance", "retired", "lost"];

pub const HARDWARE_CATEGORIES: &[&str] = &[
    "laptop", "desktop", "monitor", "phone", "tablet", "printer", "network", "peripheral", "other",
];

pub const LICENSE_TYPES: &[&str] = &["perpetual", "subscription", "volume", "oem", "open_source"];

pub const LICENSE_STATUSES: &[&str] = &["active", "expired", "expiring", "cancelled"];

pub const ASSIGNMENT_STATUSES: &[&str] = &["active", "returned", "overdue"];

pub const ASSET_TYPES: &[&str] = &["hardware", "software"];

pub const USER_STATUSES: &[&str] = &["active", "inactive", "locked"];

pub const CONDITIONS: &[&str] = &["excellent", "good", "fair", "poor", "damaged"];

/// Condition of an asset when it comes back from an assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Condition {
    Excellent,
    Good,
    Fair,
    Poor,
    Damaged,
}

impl Condition {
    pub fn as_str(self) -> &'static str {
        match self {
            Condition::Excellent => "excellent",
            Condition::Good => "good",
            Condition::Fair => "fair",
            Condition::Poor => "poor",
            Condition::Damaged => "damaged",
        }
    }

    pub fn needs_notes(self) -> bool {
        matches!(self, Condition::Poor | Condition::Damaged)
    }
}

impl FromStr for Condition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "excellent" => Ok(Condition::Excellent),
            "good" => Ok(Condition::Good),
            "fair" => Ok(Condition::Fair),
            "poor" => Ok(Condition::Poor),
            "damaged" => Ok(Condition::Damaged),
            other => Err(format!("unknown condition '{}'", other)),
        }
    }
}
