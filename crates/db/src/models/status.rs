//! Status helper enums mapping to SMALLSERIAL/SMALLINT lookup tables.
//!
//! Each enum variant's discriminant matches the seed data order (1-based)
//! in the corresponding `*_statuses` database table, and each variant's
//! name string matches the `name` column.

/// Status ID type matching SMALLINT/SMALLSERIAL in the database.
pub type StatusId = i16;

macro_rules! define_status_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $val:expr => $str:expr ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(i16)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $val ),+
        }

        impl $name {
            /// Return the database status ID.
            pub fn id(self) -> StatusId {
                self as StatusId
            }

            /// Lowercase name matching the lookup table's `name` column.
            pub fn name(self) -> &'static str {
                match self {
                    $( Self::$variant => $str ),+
                }
            }

            /// Resolve a database status ID to the corresponding variant.
            pub fn from_id(id: StatusId) -> Option<Self> {
                match id {
                    $( _ if id == $val => Some(Self::$variant), )+
                    _ => None,
                }
            }
        }

        impl From<$name> for StatusId {
            fn from(value: $name) -> Self {
                value as StatusId
            }
        }
    };
}

define_status_enum! {
    /// Batch job lifecycle status.
    JobStatus {
        Pending = 1 => "pending",
        Running = 2 => "running",
        Completed = 3 => "completed",
        Failed = 4 => "failed",
        Cancelled = 5 => "cancelled",
    }
}

define_status_enum! {
    /// Per-task execution status.
    TaskStatus {
        Pending = 1 => "pending",
        Running = 2 => "running",
        Completed = 3 => "completed",
        Failed = 4 => "failed",
    }
}

define_status_enum! {
    /// Image processing pipeline status.
    ImageStatus {
        Pending = 1 => "pending",
        Processing = 2 => "processing",
        Tagging = 3 => "tagging",
        Ready = 4 => "ready",
        Approved = 5 => "approved",
        Rejected = 6 => "rejected",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_status_ids_match_seed_data() {
        assert_eq!(JobStatus::Pending.id(), 1);
        assert_eq!(JobStatus::Running.id(), 2);
        assert_eq!(JobStatus::Completed.id(), 3);
        assert_eq!(JobStatus::Failed.id(), 4);
        assert_eq!(JobStatus::Cancelled.id(), 5);
    }

    #[test]
    fn task_status_ids_match_seed_data() {
        assert_eq!(TaskStatus::Pending.id(), 1);
        assert_eq!(TaskStatus::Running.id(), 2);
        assert_eq!(TaskStatus::Completed.id(), 3);
        assert_eq!(TaskStatus::Failed.id(), 4);
    }

    #[test]
    fn image_status_ids_match_seed_data() {
        assert_eq!(ImageStatus::Pending.id(), 1);
        assert_eq!(ImageStatus::Processing.id(), 2);
        assert_eq!(ImageStatus::Tagging.id(), 3);
        assert_eq!(ImageStatus::Ready.id(), 4);
        assert_eq!(ImageStatus::Approved.id(), 5);
        assert_eq!(ImageStatus::Rejected.id(), 6);
    }

    #[test]
    fn status_names_round_trip() {
        assert_eq!(JobStatus::Cancelled.name(), "cancelled");
        assert_eq!(TaskStatus::from_id(4), Some(TaskStatus::Failed));
        assert_eq!(ImageStatus::from_id(99), None);
    }

    #[test]
    fn status_into_status_id() {
        let id: StatusId = JobStatus::Pending.into();
        assert_eq!(id, 1);
    }
}
