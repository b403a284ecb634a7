use super::IdError;

/// Walks the `/`-separated segments of an ARM ID
pub(crate) struct SegmentParser<'a> {
    kind: &'static str,
    input: &'a str,
    segments: Vec<&'a str>,
    pos: usize,
}

impl<'a> SegmentParser<'a> {
    pub fn new(kind: &'static str, input: &'a str) -> Result<Self, IdError> {
        let Some(rest) = input.strip_prefix('/') else {
            return Err(IdError::new(kind, input, "ID must start with '/'"));
        };
        let segments: Vec<&str> = rest.split('/').collect();
        if let Some(idx) = segments.iter().position(|s| s.is_empty()) {
            return Err(IdError::new(
                kind,
                input,
                format!("segment {} is empty", idx + 1),
            ));
        }
        Ok(Self {
            kind,
            input,
            segments,
            pos: 0,
        })
    }

    fn error(&self, reason: impl Into<String>) -> IdError {
        IdError::new(self.kind, self.input, reason)
    }

    /// Consume a fixed marker, ignoring case
    pub fn marker(&mut self, expected: &str) -> Result<(), IdError> {
        match self.segments.get(self.pos) {
            Some(segment) if segment.eq_ignore_ascii_case(expected) => {
                self.pos += 1;
                Ok(())
            }
            Some(segment) => Err(self.error(format!(
                "expected segment {} to be {:?} but got {:?}",
                self.pos + 1,
                expected,
                segment
            ))),
            None => Err(self.error(format!("missing segment {:?}", expected))),
        }
    }

    /// Consume the name that follows `key`
    pub fn keyed(&mut self, key: &str) -> Result<String, IdError> {
        self.marker(key)?;
        match self.segments.get(self.pos) {
            Some(value) => {
                self.pos += 1;
                Ok((*value).to_string())
            }
            None => Err(self.error(format!("missing value for {:?}", key))),
        }
    }

    /// `subscriptions/{id}/resourceGroups/{name}`
    pub fn resource_group_scope(&mut self) -> Result<(String, String), IdError> {
        let subscription_id = self.keyed("subscriptions")?;
        let resource_group = self.keyed("resourceGroups")?;
        Ok((subscription_id, resource_group))
    }

    /// `providers/{namespace}`
    pub fn provider(&mut self, namespace: &str) -> Result<(), IdError> {
        self.marker("providers")?;
        self.marker(namespace)
    }

    pub fn finish(self) -> Result<(), IdError> {
        if self.pos == self.segments.len() {
            Ok(())
        } else {
            Err(self.error(format!(
                "unexpected trailing segments {:?}",
                self.segments[self.pos..].join("/")
            )))
        }
    }
}

/// `/subscriptions/{s}/resourceGroups/{rg}/providers/{namespace}`
pub(crate) fn provider_prefix(subscription_id: &str, resource_group: &str, namespace: &str) -> String {
    format!(
        "/subscriptions/{}/resourceGroups/{}/providers/{}",
        subscription_id,
        resource_group,
        namespace.to_ascii_lowercase()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_missing_leading_slash() {
        let err = SegmentParser::new("Resource Group", "subscriptions/s").err().unwrap();
        assert!(err.reason.contains("start with '/'"));
    }

    #[test]
    fn rejects_empty_segments() {
        let err = SegmentParser::new("Resource Group", "/subscriptions//resourceGroups/rg")
            .err()
            .unwrap();
        assert!(err.reason.contains("segment 2 is empty"));
    }

    #[test]
    fn reports_unexpected_marker() {
        let mut parser =
            SegmentParser::new("Resource Group", "/subscriptions/s/resourcegroupz/rg").unwrap();
        parser.keyed("subscriptions").unwrap();
        let err = parser.keyed("resourceGroups").unwrap_err();
        assert!(err.reason.contains("resourcegroupz"));
    }

    #[test]
    fn reports_trailing_segments() {
        let mut parser =
            SegmentParser::new("Resource Group", "/subscriptions/s/resourceGroups/rg/extra").unwrap();
        parser.resource_group_scope().unwrap();
        let err = parser.finish().unwrap_err();
        assert!(err.reason.contains("extra"));
    }
}
