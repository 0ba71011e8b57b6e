//! Where to connect to and which node to send to

use std::{convert::TryFrom, str::FromStr};

use oxamqp_types::definitions::PORT;
use url::Url;

use crate::Error;

/// Host, port and target address resolved from an `amqp://host:port/address` url
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Host name or address
    pub host: String,

    /// Port, [`PORT`] unless the url names one
    pub port: u16,

    /// Target node address taken from the url path
    pub address: String,
}

impl Endpoint {
    /// Host used when no url is given
    pub const DEFAULT_HOST: &'static str = "localhost";

    /// Target address used when the url has no path
    pub const DEFAULT_ADDRESS: &'static str = "example";

    /// Parses a url. The scheme may be left out, `localhost:5672/q1` is read
    /// as `amqp://localhost:5672/q1`.
    pub fn parse(s: &str) -> Result<Self, Error> {
        let url = match s.contains("://") {
            true => Url::parse(s)?,
            false => Url::parse(&format!("amqp://{}", s))?,
        };
        Self::try_from(&url)
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Self {
            host: String::from(Self::DEFAULT_HOST),
            port: PORT,
            address: String::from(Self::DEFAULT_ADDRESS),
        }
    }
}

impl<'a> TryFrom<&'a Url> for Endpoint {
    type Error = Error;

    fn try_from(url: &'a Url) -> Result<Self, Self::Error> {
        let host = url.host_str().ok_or(url::ParseError::EmptyHost)?;
        let address = match url.path().trim_start_matches('/') {
            "" => Self::DEFAULT_ADDRESS,
            path => path,
        };

        Ok(Self {
            host: host.to_string(),
            port: url.port().unwrap_or(PORT),
            address: address.to_string(),
        })
    }
}

impl FromStr for Endpoint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
