use anyhow::Error;
use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Permission {
    StudentView,
    ActivityView,
    AttendanceView,
    ReferralView,

    ClassView,
    StudentUpdate,
    AttendanceManage,
    EnrollmentView,
    TaskView,
    AiQuery,

    StudentManage,
    EnrollmentManage,
    ActivityManage,
    TaskManage,
    PosterManage,
    ReferralManage,
    AiUsageView,
    PageGuideManage,

    UserManage,
    RoleManage,
    SystemSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Role {
    Admin,
    Principal,
    Teacher,
    Parent,
}

static PARENT_PERMISSIONS: Lazy<HashSet<Permission>> = Lazy::new(|| {
    let mut permissions = HashSet::new();

    permissions.insert(Permission::StudentView);
    permissions.insert(Permission::ActivityView);
    permissions.insert(Permission::AttendanceView);
    permissions.insert(Permission::ReferralView);

    permissions
});

static TEACHER_PERMISSIONS: Lazy<HashSet<Permission>> = Lazy::new(|| {
    let mut permissions = HashSet::new();

    permissions.extend(PARENT_PERMISSIONS.iter().copied());

    permissions.insert(Permission::ClassView);
    permissions.insert(Permission::StudentUpdate);
    permissions.insert(Permission::AttendanceManage);
    permissions.insert(Permission::EnrollmentView);
    permissions.insert(Permission::TaskView);
    permissions.insert(Permission::AiQuery);

    permissions
});

static PRINCIPAL_PERMISSIONS: Lazy<HashSet<Permission>> = Lazy::new(|| {
    let mut permissions = HashSet::new();

    permissions.extend(TEACHER_PERMISSIONS.iter().copied());

    permissions.insert(Permission::StudentManage);
    permissions.insert(Permission::EnrollmentManage);
    permissions.insert(Permission::ActivityManage);
    permissions.insert(Permission::TaskManage);
    permissions.insert(Permission::PosterManage);
    permissions.insert(Permission::ReferralManage);
    permissions.insert(Permission::AiUsageView);
    permissions.insert(Permission::PageGuideManage);

    permissions
});

static ADMIN_PERMISSIONS: Lazy<HashSet<Permission>> = Lazy::new(|| {
    let mut permissions = HashSet::new();

    permissions.extend(PRINCIPAL_PERMISSIONS.iter().copied());

    permissions.insert(Permission::UserManage);
    permissions.insert(Permission::RoleManage);
    permissions.insert(Permission::SystemSettings);

    permissions
});

impl Permission {
    pub const ALL: [Permission; 21] = [
        Permission::StudentView,
        Permission::ActivityView,
        Permission::AttendanceView,
        Permission::ReferralView,
        Permission::ClassView,
        Permission::StudentUpdate,
        Permission::AttendanceManage,
        Permission::EnrollmentView,
        Permission::TaskView,
        Permission::AiQuery,
        Permission::StudentManage,
        Permission::EnrollmentManage,
        Permission::ActivityManage,
        Permission::TaskManage,
        Permission::PosterManage,
        Permission::ReferralManage,
        Permission::AiUsageView,
        Permission::PageGuideManage,
        Permission::UserManage,
        Permission::RoleManage,
        Permission::SystemSettings,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Permission::StudentView => "student:view",
            Permission::ActivityView => "activity:view",
            Permission::AttendanceView => "attendance:view",
            Permission::ReferralView => "referral:view",
            Permission::ClassView => "class:view",
            Permission::StudentUpdate => "student:update",
            Permission::AttendanceManage => "attendance:manage",
            Permission::EnrollmentView => "enrollment:view",
            Permission::TaskView => "task:view",
            Permission::AiQuery => "ai:query",
            Permission::StudentManage => "student:manage",
            Permission::EnrollmentManage => "enrollment:manage",
            Permission::ActivityManage => "activity:manage",
            Permission::TaskManage => "task:manage",
            Permission::PosterManage => "poster:manage",
            Permission::ReferralManage => "referral:manage",
            Permission::AiUsageView => "ai_usage:view",
            Permission::PageGuideManage => "page_guide:manage",
            Permission::UserManage => "user:manage",
            Permission::RoleManage => "role:manage",
            Permission::SystemSettings => "system:settings",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Permission::StudentView => "View students",
            Permission::ActivityView => "View activities",
            Permission::AttendanceView => "View attendance",
            Permission::ReferralView => "View referrals",
            Permission::ClassView => "View classes",
            Permission::StudentUpdate => "Update students",
            Permission::AttendanceManage => "Record attendance",
            Permission::EnrollmentView => "View enrollment applications",
            Permission::TaskView => "View tasks",
            Permission::AiQuery => "Use the AI assistant",
            Permission::StudentManage => "Manage students",
            Permission::EnrollmentManage => "Manage enrollment",
            Permission::ActivityManage => "Manage activities",
            Permission::TaskManage => "Manage tasks",
            Permission::PosterManage => "Manage posters",
            Permission::ReferralManage => "Manage referrals",
            Permission::AiUsageView => "View AI usage",
            Permission::PageGuideManage => "Manage page guides",
            Permission::UserManage => "Manage users",
            Permission::RoleManage => "Manage roles",
            Permission::SystemSettings => "System settings",
        }
    }

    pub fn from_code(code: &str) -> Result<Self, Error> {
        Permission::ALL
            .iter()
            .copied()
            .find(|p| p.code() == code)
            .ok_or_else(|| Error::msg(format!("Unknown permission: {}", code)))
    }
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Admin, Role::Principal, Role::Teacher, Role::Parent];

    pub fn permissions(&self) -> &'static HashSet<Permission> {
        match self {
            Role::Admin => &ADMIN_PERMISSIONS,
            Role::Principal => &PRINCIPAL_PERMISSIONS,
            Role::Teacher => &TEACHER_PERMISSIONS,
            Role::Parent => &PARENT_PERMISSIONS,
        }
    }

    pub fn has_permission(&self, permission: Permission) -> bool {
        self.permissions().contains(&permission)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Principal => "principal",
            Role::Teacher => "teacher",
            Role::Parent => "parent",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Role::Admin => "Administrator",
            Role::Principal => "Principal",
            Role::Teacher => "Teacher",
            Role::Parent => "Parent",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, Error> {
        match s.to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "principal" => Ok(Role::Principal),
            "teacher" => Ok(Role::Teacher),
            "parent" => Ok(Role::Parent),
            _ => Err(Error::msg(format!("Unknown role: {}", s))),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
