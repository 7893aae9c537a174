pub mod delimiter;
pub mod highlight;
pub mod literal;
pub mod qa_text;
