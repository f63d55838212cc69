use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub const ALL: [Gender; 2] = [Gender::Male, Gender::Female];

    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
        }
    }
}

/// Kindergarten grade, youngest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ClassLevel {
    Nursery,
    Junior,
    Middle,
    Senior,
}

impl ClassLevel {
    pub const ALL: [ClassLevel; 4] = [
        ClassLevel::Nursery,
        ClassLevel::Junior,
        ClassLevel::Middle,
        ClassLevel::Senior,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ClassLevel::Nursery => "nursery",
            ClassLevel::Junior => "junior",
            ClassLevel::Middle => "middle",
            ClassLevel::Senior => "senior",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ClassLevel::Nursery => "Nursery",
            ClassLevel::Junior => "Junior",
            ClassLevel::Middle => "Middle",
            ClassLevel::Senior => "Senior",
        }
    }

    /// Child age in years at the start of the school year.
    pub fn age(&self) -> i64 {
        match self {
            ClassLevel::Nursery => 2,
            ClassLevel::Junior => 3,
            ClassLevel::Middle => 4,
            ClassLevel::Senior => 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
    Leave,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "present",
            AttendanceStatus::Absent => "absent",
            AttendanceStatus::Late => "late",
            AttendanceStatus::Leave => "leave",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EnrollmentStatus {
    Pending,
    Interviewed,
    Approved,
    Rejected,
}

impl EnrollmentStatus {
    pub const ALL: [EnrollmentStatus; 4] = [
        EnrollmentStatus::Pending,
        EnrollmentStatus::Interviewed,
        EnrollmentStatus::Approved,
        EnrollmentStatus::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EnrollmentStatus::Pending => "pending",
            EnrollmentStatus::Interviewed => "interviewed",
            EnrollmentStatus::Approved => "approved",
            EnrollmentStatus::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ActivityType {
    OpenDay,
    ParentChild,
    Festival,
    Outdoor,
}

impl ActivityType {
    pub const ALL: [ActivityType; 4] = [
        ActivityType::OpenDay,
        ActivityType::ParentChild,
        ActivityType::Festival,
        ActivityType::Outdoor,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityType::OpenDay => "open_day",
            ActivityType::ParentChild => "parent_child",
            ActivityType::Festival => "festival",
            ActivityType::Outdoor => "outdoor",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            ActivityType::OpenDay => "Campus Open Day",
            ActivityType::ParentChild => "Parent-Child Crafts",
            ActivityType::Festival => "Seasonal Festival",
            ActivityType::Outdoor => "Outdoor Exploration",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TaskPriority {
    Low,
    Medium,
    High,
}

impl TaskPriority {
    pub const ALL: [TaskPriority; 3] = [TaskPriority::Low, TaskPriority::Medium, TaskPriority::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "low",
            TaskPriority::Medium => "medium",
            TaskPriority::High => "high",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 3] = [
        TaskStatus::Pending,
        TaskStatus::InProgress,
        TaskStatus::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ReferrerType {
    Teacher,
    Parent,
}

impl ReferrerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferrerType::Teacher => "teacher",
            ReferrerType::Parent => "parent",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ReferralStatus {
    Pending,
    Visited,
    Converted,
}

impl ReferralStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferralStatus::Pending => "pending",
            ReferralStatus::Visited => "visited",
            ReferralStatus::Converted => "converted",
        }
    }
}
