pub mod bitbucket;
pub mod jira;
pub mod tool_executor;
pub mod validation;
