//! General-purpose capability semantics: resources and abilities are
//! `/`-separated segment paths compared pairwise, with a single-segment
//! `*` wildcard and asymmetric whole-value wildcards.
//!
//! For resources (after the URI schemes matched exactly):
//!
//! | Capability path   | Required path   | Matches |
//! |-------------------|-----------------|---------|
//! | `user`            | `user/1`        | yes     |
//! | `user/1`          | `user`          | no      |
//! | `user/1`          | `user/1`        | yes     |
//! | `user/1`          | `user/1/doc/1`  | yes     |
//! | `user/1`          | `user/2`        | no      |
//! | `user/1`          | `doc/1`         | no      |
//! | `*`               | `user/1`        | yes     |
//! | `user/1`          | `*`             | no      |
//! | `user/1`          | `user/*`        | yes     |
//! | `user/*`          | `user/1`        | yes     |
//! | `user/1/post/1`   | `user/*/post/2` | no      |
//!
//! A required path with more segments than the capability path is a
//! sub-path of the grant and matches; a required path with fewer segments
//! does not. A capability path of `*` grants the whole scheme; a required
//! path of `*` is only satisfied by a capability path of `*`.
//!
//! For abilities the same segment walk decides an ordering rather than a
//! boolean: a capability ability enables a required ability when it
//! compares greater than or equal.
//!
//! | Capability ability | Required ability  | Enables |
//! |--------------------|-------------------|---------|
//! | `user/post`        | `user/post`       | yes     |
//! | `user/post`        | `user/post/draft` | yes     |
//! | `user/post/draft`  | `user/post`       | no      |
//! | `*`                | `user/post`       | yes     |
//! | `user/post`        | `*`               | no      |
//! | `user/*`           | `user/post`       | yes     |
//! | `user/post`        | `user/*`          | no      |

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, fmt};
use url::Url;
use warrant_ucan::capability::{Ability, CapabilitySemantics, Scope};

/// A resource identified by a URI scheme and a segment path, for example
/// `api:user/1/profile`.
#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
pub struct PathResource {
    scheme: String,
    path: String,
}

impl PathResource {
    pub fn new(scheme: &str, path: &str) -> Self {
        PathResource {
            scheme: scheme.to_owned(),
            path: path.to_owned(),
        }
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl Scope for PathResource {
    fn contains(&self, other: &Self) -> bool {
        if self.scheme != other.scheme {
            return false;
        }

        if self.path == "*" {
            return true;
        }

        if other.path == "*" {
            return false;
        }

        let mut required_segments = other.path.split('/');

        for segment in self.path.split('/') {
            match required_segments.next() {
                Some(required_segment) => {
                    if segment != "*" && required_segment != "*" && segment != required_segment {
                        return false;
                    }
                }
                // The required path is shorter than the granted one
                None => return false,
            }
        }

        // Remaining required segments address a sub-path of this grant
        true
    }
}

impl fmt::Display for PathResource {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.scheme, self.path)
    }
}

impl TryFrom<Url> for PathResource {
    type Error = anyhow::Error;

    fn try_from(value: Url) -> Result<Self> {
        let mut path = value.host_str().unwrap_or("").to_owned();
        let url_path = value.path().trim_start_matches('/');

        if !url_path.is_empty() {
            if path.is_empty() {
                path = url_path.to_owned();
            } else {
                path.push('/');
                path.push_str(url_path);
            }
        }

        if path.is_empty() {
            return Err(anyhow!("no path in resource: {value}"));
        }

        Ok(PathResource {
            scheme: value.scheme().to_owned(),
            path,
        })
    }
}

impl TryFrom<&str> for PathResource {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self> {
        PathResource::try_from(Url::parse(value)?)
    }
}

/// An ability expressed as a segment path, for example `user/post/draft`.
#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
pub struct PathAbility(String);

impl Ability for PathAbility {}

impl PathAbility {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl PartialOrd for PathAbility {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PathAbility {
    fn cmp(&self, other: &Self) -> Ordering {
        if self.0 == other.0 {
            return Ordering::Equal;
        }

        if self.0 == "*" {
            return Ordering::Greater;
        }

        if other.0 == "*" {
            return Ordering::Less;
        }

        let mut required_segments = other.0.split('/');
        let mut result = Ordering::Equal;

        for segment in self.0.split('/') {
            match required_segments.next() {
                Some(required_segment) => {
                    if segment == "*" && required_segment == "*" {
                        // No change in ordering
                    } else if segment == "*" {
                        result = Ordering::Greater;
                    } else if required_segment == "*" {
                        result = Ordering::Less;
                    } else if segment != required_segment {
                        return Ordering::Less;
                    }
                }
                // This ability is more specific than the required one
                None => return Ordering::Less,
            }
        }

        if required_segments.next().is_some() {
            Ordering::Greater
        } else {
            result
        }
    }
}

impl fmt::Display for PathAbility {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for PathAbility {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self> {
        if value.is_empty() {
            return Err(anyhow!("an ability cannot be empty"));
        }

        Ok(PathAbility(value))
    }
}

/// The semantics used by the verification engine: any URI scheme, segment
/// paths for both resources and abilities.
pub struct PathSemantics {}

impl CapabilitySemantics<PathResource, PathAbility> for PathSemantics {}

pub const PATH_SEMANTICS: PathSemantics = PathSemantics {};
