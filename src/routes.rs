//! Static route table mapping application paths to views.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum View {
    ThemeManagement,
    DataSourceManagement,
    StandardizationWorkbench,
    CrawlTaskManagement,
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            View::ThemeManagement => "ThemeManagement",
            View::DataSourceManagement => "DataSourceManagement",
            View::StandardizationWorkbench => "StandardizationWorkbench",
            View::CrawlTaskManagement => "CrawlTaskManagement",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    /// Path pattern; `:name` segments capture a parameter.
    pub pattern: &'static str,
    pub view: View,
}

pub const ROUTES: &[Route] = &[
    Route {
        pattern: "/",
        view: View::ThemeManagement,
    },
    Route {
        pattern: "/data-sources",
        view: View::DataSourceManagement,
    },
    Route {
        pattern: "/workbench/:themeName",
        view: View::StandardizationWorkbench,
    },
    Route {
        pattern: "/tasks",
        view: View::CrawlTaskManagement,
    },
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch {
    pub view: View,
    pub params: BTreeMap<String, String>,
}

impl RouteMatch {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }
}

fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

impl Route {
    pub fn matches(&self, path: &str) -> Option<RouteMatch> {
        let pattern = segments(self.pattern);
        let actual = segments(path);
        if pattern.len() != actual.len() {
            return None;
        }

        let mut params = BTreeMap::new();
        for (expected, got) in pattern.iter().zip(actual) {
            match expected.strip_prefix(':') {
                Some(name) => {
                    params.insert(name.to_string(), got.to_string());
                }
                None if *expected == got => {}
                None => return None,
            }
        }
        Some(RouteMatch {
            view: self.view,
            params,
        })
    }
}

/// Find the first route matching `path`. Query string and fragment are ignored.
pub fn resolve(path: &str) -> Option<RouteMatch> {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    ROUTES.iter().find_map(|route| route.matches(path))
}
