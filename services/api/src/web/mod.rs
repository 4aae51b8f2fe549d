pub mod rest;
pub mod state;

// Re-export the handlers the binary wires into the router.
pub use rest::{
    chat_handler, continue_course_handler, create_curriculum_handler, engagement_handler,
    feedback_handler, list_curricula_handler, start_quiz_handler, study_intention_handler,
    submit_attempt_handler,
};
