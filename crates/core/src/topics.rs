//! Well-known outbox topic name constants.
//!
//! Business handlers publish under these names. The outbox store does not
//! enumerate topics, so new names can be added here without a migration.

/// A learner was enrolled in a course.
pub const ENROLLMENT_CREATED: &str = "enrollment.created";

/// A learner dropped or was removed from a course.
pub const ENROLLMENT_CANCELLED: &str = "enrollment.cancelled";

/// A course was published and became visible to learners.
pub const COURSE_PUBLISHED: &str = "course.published";

/// A learner completed a lesson.
pub const LESSON_COMPLETED: &str = "lesson.completed";

/// A learner submitted a quiz attempt.
pub const QUIZ_SUBMITTED: &str = "quiz.submitted";

/// A completion certificate was issued.
pub const CERTIFICATE_ISSUED: &str = "certificate.issued";

/// Returns `true` if `topic` is usable as an outbox topic.
///
/// Topics are free-form but must contain at least one non-whitespace
/// character.
pub fn is_valid_topic(topic: &str) -> bool {
    !topic.trim().is_empty()
}
