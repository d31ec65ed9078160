pub mod issues;

pub use issues::{InlineIssueSource, Issue, IssueSet, IssueSource};
