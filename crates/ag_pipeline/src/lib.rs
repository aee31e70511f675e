pub mod history;
pub mod markdown;
pub mod outcome;
pub mod reference;
pub mod session;

pub use history::ArticleHistory;
pub use markdown::{extract_headings, render_html};
pub use outcome::{OutcomeCounts, OutcomeSink, PersistenceOutcome, TracingOutcomeSink};
pub use reference::extract_pdf_text;
pub use session::{
    ArticleInput, GenerationSession, Pipeline, SessionSnapshot, StageErrors, StageFlags, Step, TitleChoice,
    TitleInput,
};

pub mod prelude {
    pub use super::{
        extract_pdf_text, ArticleHistory, ArticleInput, GenerationSession, Pipeline, Step, TitleChoice, TitleInput,
    };
    pub use ag_core::{Article, ArticleStatus, Error, GenerationConfig, PlanType, Result};
    pub use ag_publish::WordPressStatus;
}
