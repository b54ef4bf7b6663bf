use crate::constants::Role;

pub const LOGIN_ROUTE: &str = "/login";

const ALL: &[Role] = &[Role::Admin, Role::Manager, Role::User];
const STAFF: &[Role] = &[Role::Admin, Role::Manager];
const ADMIN: &[Role] = &[Role::Admin];

const PUBLIC_ROUTES: &[&str] = &[LOGIN_ROUTE, "/forgot-password", "/reset-password"];

/// Path prefix to the roles allowed to open it. The longest matching prefix
/// decides, so `/hardware/new` can be narrower than `/hardware`.
const ROUTE_TABLE: &[(&str, &[Role])] = &[
    ("/", ALL),
    ("/dashboard", ALL),
    ("/profile", ALL),
    ("/employees", ALL),
    ("/employees/new", STAFF),
    ("/employees/edit", STAFF),
    ("/hardware", ALL),
    ("/hardware/new", STAFF),
    ("/hardware/edit", STAFF),
    ("/software", ALL),
    ("/software/new", STAFF),
    ("/software/edit", STAFF),
    ("/assignments", STAFF),
    ("/assignments/my", ALL),
    ("/reports", STAFF),
    ("/import", STAFF),
    ("/export", ALL),
    ("/users", ADMIN),
    ("/activity-log", ADMIN),
    ("/settings", ADMIN),
];

fn prefix_matches(path: &str, prefix: &str) -> bool {
    if prefix == "/" {
        return path == "/";
    }
    path == prefix
        || path
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/'))
}

fn normalize(path: &str) -> &str {
    let path = path.split(['?', '#']).next().unwrap_or(path);
    if path.len() > 1 {
        path.trim_end_matches('/')
    } else {
        path
    }
}

pub fn is_public_route(path: &str) -> bool {
    let path = normalize(path);
    PUBLIC_ROUTES.iter().any(|p| prefix_matches(path, p))
}

/// Roles allowed on `path`, or `None` when the path is not in the table.
pub fn allowed_roles(path: &str) -> Option<&'static [Role]> {
    let path = normalize(path);
    ROUTE_TABLE
        .iter()
        .filter(|(prefix, _)| prefix_matches(path, prefix))
        .max_by_key(|(prefix, _)| prefix.len())
        .map(|(_, roles)| *roles)
}

/// Unknown paths are denied.
pub fn can_access(path: &str, role: Role) -> bool {
    if is_public_route(path) {
        return true;
    }
    allowed_roles(path).is_some_and(|roles| roles.contains(&role))
}

pub fn is_admin_route(path: &str) -> bool {
    allowed_roles(path).is_some_and(|roles| roles == ADMIN)
}

pub fn default_route_for(role: Role) -> &'static str {
    match role {
        Role::Admin | Role::Manager => "/dashboard",
        Role::User => "/assignments/my",
    }
}
