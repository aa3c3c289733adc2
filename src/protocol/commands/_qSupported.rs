use super::prelude::*;

#[derive(Debug)]
pub struct qSupported<'a> {
    pub features: Features<'a>,
}

impl<'a> ParseCommand<'a> for qSupported<'a> {
    fn from_packet(buf: PacketBuf<'a>) -> Option<Self> {
        let body = buf.into_body_str()?;
        let features = match body {
            "" => "",
            _ => body.strip_prefix(':')?,
        };

        Some(qSupported {
            features: Features(features),
        })
    }
}

/// The features the client reports, e.g: `multiprocess+;swbreak+`.
#[derive(Debug)]
pub struct Features<'a>(&'a str);

impl<'a> Features<'a> {
    pub fn into_iter(self) -> impl Iterator<Item = Feature<'a>> + 'a {
        self.0.split(';').filter(|s| !s.is_empty()).map(|s| {
            match s.as_bytes()[s.len() - 1] {
                b'+' => Feature::new(&s[..s.len() - 1], None, FeatureSupported::Yes),
                b'-' => Feature::new(&s[..s.len() - 1], None, FeatureSupported::No),
                b'?' => Feature::new(&s[..s.len() - 1], None, FeatureSupported::Maybe),
                _ => {
                    let mut parts = s.splitn(2, '=');
                    let name = parts.next().unwrap_or(s);
                    Feature::new(name, parts.next(), FeatureSupported::Yes)
                }
            }
        })
    }
}

#[derive(PartialEq, Eq, Debug)]
pub enum FeatureSupported {
    Yes,
    No,
    Maybe,
}

#[derive(PartialEq, Eq, Debug)]
pub struct Feature<'a> {
    pub name: &'a str,
    pub val: Option<&'a str>,
    pub status: FeatureSupported,
}

impl<'a> Feature<'a> {
    fn new(name: &'a str, val: Option<&'a str>, status: FeatureSupported) -> Feature<'a> {
        Feature { name, val, status }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_client_features() {
        let mut buf = b":multiprocess+;xmlRegisters=i386;fork-events-;vContSupported?".to_vec();
        let cmd = qSupported::from_packet(PacketBuf::new_with_raw_body(&mut buf)).unwrap();
        let features: Vec<_> = cmd.features.into_iter().collect();
        assert_eq!(
            features,
            [
                Feature::new("multiprocess", None, FeatureSupported::Yes),
                Feature::new("xmlRegisters", Some("i386"), FeatureSupported::Yes),
                Feature::new("fork-events", None, FeatureSupported::No),
                Feature::new("vContSupported", None, FeatureSupported::Maybe),
            ]
        );
    }

    #[test]
    fn bare_query() {
        let mut buf = Vec::new();
        let cmd = qSupported::from_packet(PacketBuf::new_with_raw_body(&mut buf)).unwrap();
        assert_eq!(cmd.features.into_iter().count(), 0);
    }
}
