// ABOUTME: Scope derivation from request paths
// ABOUTME: Maps /api/v1/<segment>/... to the scope token <segment>
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Mealtime

const API_PREFIX: &str = "/api/v1/";

/// Derive the scope token a request path requires.
///
/// The first path segment after `/api/v1/` is the scope; repeated slashes
/// are collapsed first. Paths outside the versioned API surface require no
/// scope and map to the empty string.
#[must_use]
pub fn scope_from_path(path: &str) -> String {
    let collapsed = collapse_slashes(path);
    let Some(rest) = collapsed.strip_prefix(API_PREFIX) else {
        return String::new();
    };
    rest.split('/').next().unwrap_or_default().to_owned()
}

fn collapse_slashes(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut previous_was_slash = false;
    for c in path.chars() {
        if c == '/' {
            if previous_was_slash {
                continue;
            }
            previous_was_slash = true;
        } else {
            previous_was_slash = false;
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_paths_map_to_first_segment() {
        assert_eq!(scope_from_path("/api/v1/meal_plans/123"), "meal_plans");
        assert_eq!(scope_from_path("/api/v1/households"), "households");
        assert_eq!(scope_from_path("/api/v1/oauth2_clients/"), "oauth2_clients");
    }

    #[test]
    fn test_repeated_slashes_collapse() {
        assert_eq!(scope_from_path("/api/v1//meal_plans//123"), "meal_plans");
        assert_eq!(scope_from_path("//api/v1/recipes"), "recipes");
    }

    #[test]
    fn test_paths_outside_the_api_require_no_scope() {
        assert_eq!(scope_from_path("/users/login"), "");
        assert_eq!(scope_from_path("/oauth2/token"), "");
        assert_eq!(scope_from_path("/"), "");
        assert_eq!(scope_from_path(""), "");
    }

    #[test]
    fn test_bare_prefix_maps_to_empty() {
        assert_eq!(scope_from_path("/api/v1/"), "");
    }
}
