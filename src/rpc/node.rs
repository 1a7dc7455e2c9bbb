//! Node addresses and the immutable node list.

use std::fmt;
use std::sync::Arc;

use url::Url;

use crate::error::{ClientError, ClientResult};

/// Transport scheme for a node. Bare hostnames default to HTTPS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    fn as_str(self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }
}

/// A single RPC node, reduced to scheme + `host[:port]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    scheme: Scheme,
    authority: String,
}

impl Node {
    /// Normalize a hostname or URL. Any path, query or fragment is dropped.
    ///
    /// `api.hive.blog`, `https://api.hive.blog/` and `api.hive.blog/rpc` all
    /// produce the same node. An explicit `http://` is kept for local nodes.
    pub fn parse(raw: &str) -> ClientResult<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ClientError::Configuration("empty node address".into()));
        }

        let candidate = if trimmed.contains("://") {
            trimmed.to_string()
        } else {
            format!("https://{}", trimmed)
        };

        let url = Url::parse(&candidate).map_err(|e| {
            ClientError::Configuration(format!("invalid node '{}': {}", raw, e))
        })?;

        let scheme = match url.scheme() {
            "https" => Scheme::Https,
            "http" => Scheme::Http,
            other => {
                return Err(ClientError::Configuration(format!(
                    "unsupported scheme '{}' for node '{}'",
                    other, raw
                )))
            }
        };

        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| ClientError::Configuration(format!("node '{}' has no host", raw)))?;

        let authority = match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };

        Ok(Self { scheme, authority })
    }

    /// `host[:port]` as used in logs and metrics.
    pub fn authority(&self) -> &str {
        &self.authority
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    /// The URL requests are POSTed to.
    pub fn endpoint(&self) -> String {
        format!("{}://{}/", self.scheme.as_str(), self.authority)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.authority)
    }
}

/// Ordered, immutable list of nodes.
///
/// Built once at client init. Changing nodes means building a new list and
/// swapping it in through an explicit `replace_nodes`, never editing in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeList(Arc<[Node]>);

impl NodeList {
    pub fn new<I, S>(raw: I) -> ClientResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let nodes = raw
            .into_iter()
            .map(|r| Node::parse(r.as_ref()))
            .collect::<ClientResult<Vec<_>>>()?;

        if nodes.is_empty() {
            return Err(ClientError::Configuration(
                "node list must contain at least one node".into(),
            ));
        }
        Ok(Self(nodes.into()))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Node> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn first(&self) -> Option<&Node> {
        self.0.first()
    }
}

impl<'a> IntoIterator for &'a NodeList {
    type Item = &'a Node;
    type IntoIter = std::slice::Iter<'a, Node>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
