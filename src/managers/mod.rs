pub mod bitbucket;
pub mod jira;
