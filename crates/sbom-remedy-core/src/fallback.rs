use crate::ecosystem::PackageEcosystem;

/// Deterministic, network-free remediation script keyed by ecosystem.
///
/// Last tier of the fallback chain: always succeeds, pure, no I/O. Identical
/// input produces byte-identical output, which golden tests rely on. Unknown
/// ecosystems get a commented placeholder instead of an executable command.
pub fn fallback_script(ecosystem: PackageEcosystem) -> String {
    let mut script = String::new();
    script.push_str("#!/bin/bash\n");
    script.push_str(&format!(
        "# Remediation script ({} ecosystem, manager: {})\n",
        ecosystem.label(),
        ecosystem.package_manager()
    ));
    script.push_str("# Review before running.\n\n");

    match ecosystem.upgrade_command() {
        Some(cmd) => {
            script.push_str(cmd);
            script.push('\n');
        }
        None => {
            script.push_str("# No ecosystem-specific upgrade command available.\n");
            script.push_str("# Update the affected dependencies manually.\n");
        }
    }

    script.push_str("\n# General recommendations:\n");
    script.push_str("# - Review direct and transitive dependencies for known advisories.\n");
    script.push_str("# - Pin dependency versions with a lockfile and commit it.\n");
    script.push_str("# - Automate vulnerability scanning in CI.\n");
    script
}
