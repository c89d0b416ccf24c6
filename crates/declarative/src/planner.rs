//! Target selection - pick which declared resources a pass should touch

use anyhow::{Result, bail};

use crate::resource::Resource;

/// Filter resources to those matching a target pattern
///
/// Target format: "type" or "type.name". Types match case-insensitively,
/// either exactly, by prefix, or through a short alias ("switch", "vm",
/// "disk", "host"). A target with an empty type or name is rejected.
pub fn filter_by_target<'a, R: Resource>(
    resources: &'a [R],
    target: Option<&str>,
) -> Result<Vec<&'a R>> {
    match target {
        None => Ok(resources.iter().collect()),
        Some(t) => {
            let (resource_type, name) = parse_target(t)?;
            Ok(resources
                .iter()
                .filter(|r| matches_filter(*r, Some(resource_type.as_str()), name.as_deref()))
                .collect())
        }
    }
}

/// Parse a target string like "type.name" into (type, name)
///
/// Only the first dot separates the type, so names may contain dots.
fn parse_target(target: &str) -> Result<(String, Option<String>)> {
    let target = target.trim();
    match target.split_once('.') {
        None if !target.is_empty() => Ok((target.to_string(), None)),
        Some((t, name)) if !t.is_empty() && !name.is_empty() => {
            Ok((t.to_string(), Some(name.to_string())))
        }
        _ => bail!("malformed target '{}': expected \"type\" or \"type.name\"", target),
    }
}

/// Check if a resource matches the filter criteria
fn matches_filter<R: Resource + ?Sized>(
    resource: &R,
    resource_type: Option<&str>,
    name: Option<&str>,
) -> bool {
    if let Some(rt) = resource_type {
        let actual = resource.resource_type().to_ascii_lowercase();
        let rt = rt.to_ascii_lowercase();
        // Allow common aliases
        let matches_type = match rt.as_str() {
            "switch" | "switches" => actual.ends_with("switch"),
            "vm" | "machine" | "machines" => actual == "virtualmachine",
            "disk" | "disks" => actual == "virtualdisk",
            "host" | "hosts" => actual.ends_with("host"),
            _ => actual == rt || actual.starts_with(&rt),
        };
        if !matches_type {
            return false;
        }
    }

    if let Some(n) = name
        && resource.id() != n
    {
        return false;
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Named(&'static str, &'static str);

    impl Resource for Named {
        fn id(&self) -> String {
            self.1.to_string()
        }

        fn resource_type(&self) -> &'static str {
            self.0
        }
    }

    #[test]
    fn test_parse_target() {
        assert_eq!(parse_target("switch").unwrap(), ("switch".to_string(), None));
        assert_eq!(
            parse_target("vm.web01").unwrap(),
            ("vm".to_string(), Some("web01".to_string()))
        );
        assert_eq!(
            parse_target("disk.web01.vhdx").unwrap(),
            ("disk".to_string(), Some("web01.vhdx".to_string()))
        );
    }

    #[test]
    fn test_malformed_targets_are_rejected() {
        let resources = [Named("VirtualMachine", ".x")];

        for target in [".x", "vm.", ".", "", "  "] {
            let err = filter_by_target(&resources, Some(target)).unwrap_err();
            assert!(err.to_string().contains("malformed target"), "{}", target);
        }
    }

    #[test]
    fn test_filter_by_alias_and_name() {
        let resources = [
            Named("ExternalSwitch", "LAN"),
            Named("PrivateSwitch", "backplane"),
            Named("VirtualMachine", "web01"),
        ];

        assert_eq!(filter_by_target(&resources, None).unwrap().len(), 3);
        assert_eq!(filter_by_target(&resources, Some("switch")).unwrap().len(), 2);

        let vm = filter_by_target(&resources, Some("vm.web01")).unwrap();
        assert_eq!(vm.len(), 1);
        assert_eq!(vm[0].1, "web01");

        assert!(filter_by_target(&resources, Some("vm.web02")).unwrap().is_empty());
        assert_eq!(
            filter_by_target(&resources, Some("externalswitch")).unwrap().len(),
            1
        );
    }
}
