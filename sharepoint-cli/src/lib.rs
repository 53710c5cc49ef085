//! Typed OData query translation and CSOM batching for SharePoint and
//! Microsoft Graph

pub mod api;
pub mod cli;
pub mod config;
