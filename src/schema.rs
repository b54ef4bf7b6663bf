use crate::constants::{
    ASSET_TYPES, ASSIGNMENT_STATUSES, CONDITIONS, EMPLOYEE_STATUSES, HARDWARE_CATEGORIES,
    HARDWARE_STATUSES, LICENSE_STATUSES, LICENSE_TYPES, ROLES, USER_STATUSES,
};
use crate::validation::FieldFormat;
use clap::ValueEnum;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Text,
    Number,
    Date,
    Format(FieldFormat),
    Enum(&'static [&'static str]),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ColumnDef {
    pub key: &'static str,
    pub label: &'static str,
    pub required: bool,
    pub kind: ColumnKind,
}

impl ColumnDef {
    pub const fn new(key: &'static str, label: &'static str, kind: ColumnKind) -> Self {
        Self {
            key,
            label,
            required: false,
            kind,
        }
    }

    pub const fn required(key: &'static str, label: &'static str, kind: ColumnKind) -> Self {
        Self {
            key,
            label,
            required: true,
            kind,
        }
    }
}

#[derive(Debug)]
pub struct Schema {
    pub name: &'static str,
    pub columns: &'static [ColumnDef],
    /// Pairs of date columns where the second may not precede the first.
    pub date_order: &'static [(&'static str, &'static str)],
}

impl Schema {
    pub fn column(&self, key: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.key == key)
    }

    pub fn required_columns(&self) -> impl Iterator<Item = &ColumnDef> {
        self.columns.iter().filter(|c| c.required)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Resource {
    Employees,
    Hardware,
    Software,
    Assignments,
    Users,
}

impl Resource {
    pub fn path(self) -> &'static str {
        match self {
            Resource::Employees => "/employees",
            Resource::Hardware => "/hardware",
            Resource::Software => "/software",
            Resource::Assignments => "/assignments",
            Resource::Users => "/users",
        }
    }

    pub fn name(self) -> &'static str {
        self.schema().name
    }

    pub fn schema(self) -> &'static Schema {
        match self {
            Resource::Employees => &EMPLOYEES,
            Resource::Hardware => &HARDWARE,
            Resource::Software => &SOFTWARE,
            Resource::Assignments => &ASSIGNMENTS,
            Resource::Users => &USERS,
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub static EMPLOYEES: Schema = Schema {
    name: "employees",
    columns: &[
        ColumnDef::required("employeeId", "Employee ID", ColumnKind::Format(FieldFormat::EmployeeId)),
        ColumnDef::required("firstName", "First Name", ColumnKind::Text),
        ColumnDef::required("lastName", "Last Name", ColumnKind::Text),
        ColumnDef::required("email", "Email", ColumnKind::Format(FieldFormat::Email)),
        ColumnDef::new("department", "Department", ColumnKind::Text),
        ColumnDef::new("position", "Position", ColumnKind::Text),
        ColumnDef::new("phone", "Phone", ColumnKind::Format(FieldFormat::Phone)),
        ColumnDef::new("status", "Status", ColumnKind::Enum(EMPLOYEE_STATUSES)),
        ColumnDef::new("hireDate", "Hire Date", ColumnKind::Date),
    ],
    date_order: &[],
};

pub static HARDWARE: Schema = Schema {
    name: "hardware",
    columns: &[
        ColumnDef::required("assetTag", "Asset Tag", ColumnKind::Format(FieldFormat::AssetTag)),
        ColumnDef::required("name", "Name", ColumnKind::Text),
        ColumnDef::required("category", "Category", ColumnKind::Enum(HARDWARE_CATEGORIES)),
        ColumnDef::new("manufacturer", "Manufacturer", ColumnKind::Text),
        ColumnDef::new("model", "Model", ColumnKind::Text),
        ColumnDef::new("serialNumber", "Serial Number", ColumnKind::Format(FieldFormat::SerialNumber)),
        ColumnDef::new("status", "Status", ColumnKind::Enum(HARDWARE_STATUSES)),
        ColumnDef::new("condition", "Condition", ColumnKind::Enum(CONDITIONS)),
        ColumnDef::new("purchaseDate", "Purchase Date", ColumnKind::Date),
        ColumnDef::new("purchasePrice", "Purchase Price", ColumnKind::Number),
        ColumnDef::new("warrantyExpiry", "Warranty Expiry", ColumnKind::Date),
        ColumnDef::new("location", "Location", ColumnKind::Text),
        ColumnDef::new("macAddress", "MAC Address", ColumnKind::Format(FieldFormat::MacAddress)),
    ],
    date_order: &[("purchaseDate", "warrantyExpiry")],
};

pub static SOFTWARE: Schema = Schema {
    name: "software",
    columns: &[
        ColumnDef::required("name", "Name", ColumnKind::Text),
        ColumnDef::required("vendor", "Vendor", ColumnKind::Text),
        ColumnDef::new("version", "Version", ColumnKind::Text),
        ColumnDef::new("licenseKey", "License Key", ColumnKind::Format(FieldFormat::LicenseKey)),
        ColumnDef::new("licenseType", "License Type", ColumnKind::Enum(LICENSE_TYPES)),
        ColumnDef::required("totalLicenses", "Total Licenses", ColumnKind::Number),
        ColumnDef::new("usedLicenses", "Used Licenses", ColumnKind::Number),
        ColumnDef::new("purchaseDate", "Purchase Date", ColumnKind::Date),
        ColumnDef::new("expiryDate", "Expiry Date", ColumnKind::Date),
        ColumnDef::new("cost", "Cost", ColumnKind::Number),
        ColumnDef::new("status", "Status", ColumnKind::Enum(LICENSE_STATUSES)),
    ],
    date_order: &[("purchaseDate", "expiryDate")],
};

pub static ASSIGNMENTS: Schema = Schema {
    name: "assignments",
    columns: &[
        ColumnDef::required("assetType", "Asset Type", ColumnKind::Enum(ASSET_TYPES)),
        ColumnDef::required("assetId", "Asset ID", ColumnKind::Text),
        ColumnDef::required("employeeId", "Employee ID", ColumnKind::Format(FieldFormat::EmployeeId)),
        ColumnDef::required("assignedDate", "Assigned Date", ColumnKind::Date),
        ColumnDef::new("expectedReturnDate", "Expected Return Date", ColumnKind::Date),
        ColumnDef::new("status", "Status", ColumnKind::Enum(ASSIGNMENT_STATUSES)),
        ColumnDef::new("notes", "Notes", ColumnKind::Text),
    ],
    date_order: &[("assignedDate", "expectedReturnDate")],
};

pub static USERS: Schema = Schema {
    name: "users",
    columns: &[
        ColumnDef::required("email", "Email", ColumnKind::Format(FieldFormat::Email)),
        ColumnDef::required("firstName", "First Name", ColumnKind::Text),
        ColumnDef::required("lastName", "Last Name", ColumnKind::Text),
        ColumnDef::required("role", "Role", ColumnKind::Enum(ROLES)),
        ColumnDef::new("status", "Status", ColumnKind::Enum(USER_STATUSES)),
    ],
    date_order: &[],
};
