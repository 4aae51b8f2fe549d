pub mod db;
pub mod feedback_llm;
pub mod judge_llm;
pub mod lesson_llm;
pub mod quiz_llm;
pub mod tokenizer;
pub mod tutor_llm;

pub use db::DbAdapter;
pub use feedback_llm::OpenAiFeedbackAdapter;
pub use judge_llm::OpenAiJudgeAdapter;
pub use lesson_llm::OpenAiLessonAdapter;
pub use quiz_llm::OpenAiQuizAdapter;
pub use tokenizer::CharEstimator;
pub use tutor_llm::OpenAiTutorAdapter;
