//! Tests for the commands that add to the queue.

use super::parse;
use crate::cli::{Cli, CliCommand, PrefType};
use clap::Parser;
use synq_core::command::TimelineScope;

#[test]
fn cli_parse_post() {
    match parse(&["synq", "post", "--account", "alice", "hello world"]) {
        CliCommand::Post {
            account,
            reply_to,
            recipient,
            text,
        } => {
            assert_eq!(account, "alice");
            assert_eq!(text, "hello world");
            assert!(reply_to.is_none());
            assert!(recipient.is_none());
        }
        _ => panic!("expected Post"),
    }
}

#[test]
fn cli_parse_post_reply() {
    match parse(&[
        "synq", "post", "--account", "alice", "--reply-to", "123", "--recipient", "9", "hi",
    ]) {
        CliCommand::Post {
            reply_to, recipient, ..
        } => {
            assert_eq!(reply_to, Some(123));
            assert_eq!(recipient, Some(9));
        }
        _ => panic!("expected Post"),
    }
}

#[test]
fn cli_parse_post_requires_account() {
    assert!(Cli::try_parse_from(["synq", "post", "hello"]).is_err());
}

#[test]
fn cli_parse_search() {
    match parse(&["synq", "search", "--account", "bob", "#rustlang"]) {
        CliCommand::Search { account, query } => {
            assert_eq!(account, "bob");
            assert_eq!(query, "#rustlang");
        }
        _ => panic!("expected Search"),
    }
}

#[test]
fn cli_parse_follow_and_unfollow() {
    match parse(&["synq", "follow", "--account", "bob", "42"]) {
        CliCommand::Follow { account, user_id } => {
            assert_eq!(account, "bob");
            assert_eq!(user_id, 42);
        }
        _ => panic!("expected Follow"),
    }
    match parse(&["synq", "unfollow", "--account", "bob", "42"]) {
        CliCommand::Unfollow { user_id, .. } => assert_eq!(user_id, 42),
        _ => panic!("expected Unfollow"),
    }
}

#[test]
fn cli_parse_fetch_defaults_to_home() {
    match parse(&["synq", "fetch", "--account", "alice"]) {
        CliCommand::Fetch { timeline, .. } => assert_eq!(timeline, TimelineScope::Home),
        _ => panic!("expected Fetch"),
    }
    match parse(&["synq", "fetch", "--account", "alice", "--timeline", "mentions"]) {
        CliCommand::Fetch { timeline, .. } => assert_eq!(timeline, TimelineScope::Mentions),
        _ => panic!("expected Fetch"),
    }
}

#[test]
fn cli_parse_fetch_rejects_unknown_timeline() {
    assert!(
        Cli::try_parse_from(["synq", "fetch", "--account", "a", "--timeline", "sideways"]).is_err()
    );
}

#[test]
fn cli_parse_fetch_user() {
    match parse(&["synq", "fetch-user", "--account", "alice", "7"]) {
        CliCommand::FetchUser { account, user_id } => {
            assert_eq!(account, "alice");
            assert_eq!(user_id, 7);
        }
        _ => panic!("expected FetchUser"),
    }
}

#[test]
fn cli_parse_pref() {
    match parse(&["synq", "pref", "theme", "dark"]) {
        CliCommand::Pref {
            key,
            value,
            pref_type,
            account,
        } => {
            assert_eq!(key, "theme");
            assert_eq!(value, "dark");
            assert_eq!(pref_type, PrefType::String);
            assert_eq!(account, "");
        }
        _ => panic!("expected Pref"),
    }
    match parse(&["synq", "pref", "page_size", "50", "--type", "long", "--account", "bob"]) {
        CliCommand::Pref {
            pref_type, account, ..
        } => {
            assert_eq!(pref_type, PrefType::Long);
            assert_eq!(account, "bob");
        }
        _ => panic!("expected Pref"),
    }
}
