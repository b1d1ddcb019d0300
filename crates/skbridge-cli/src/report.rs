use std::fmt;
use std::rc::Rc;

use skbridge_core::{BindError, BindingKind, BlueprintInterface, ExposeHook};
use skbridge_reflect::HostClass;

/// Collects what a re-synchronization pass did
#[derive(Debug, Default)]
pub struct ExposeReport {
    pub updated_classes: Vec<String>,
    pub rejected: Vec<BindError>,
}

impl ExposeHook for ExposeReport {
    fn on_class_updated(&mut self, class: &Rc<HostClass>) {
        self.updated_classes.push(class.name().to_string());
    }

    fn on_routine_rejected(&mut self, error: &BindError) {
        self.rejected.push(error.clone());
    }
}

impl fmt::Display for ExposeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.updated_classes.is_empty() {
            writeln!(f, "No host classes changed")?;
        } else {
            writeln!(f, "Updated host classes: {}", self.updated_classes.join(", "))?;
        }

        if !self.rejected.is_empty() {
            writeln!(f, "Rejected routines:")?;
            for error in &self.rejected {
                writeln!(f, "  {}", error)?;
            }
        }
        Ok(())
    }
}

/// One line per live binding
pub fn registry_table(interface: &BlueprintInterface) -> String {
    let mut out = String::new();
    for (index, entry) in interface.registry().entries() {
        let kind = match entry.kind() {
            BindingKind::Function => "function",
            BindingKind::Event => "event",
        };
        let scope = if entry.is_class_member { "@@" } else { "@" };
        let status = if entry.routine.is_some() { "" } else { " (unbound)" };
        out.push_str(&format!(
            "{:>4}  {:<8}  {}{}{}  params={}{}\n",
            index, kind, entry.class_name, scope, entry.routine_name, entry.num_params, status
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_lists_rejections() {
        let report = ExposeReport {
            updated_classes: vec!["Actor".to_string()],
            rejected: vec![BindError::EventWithResult {
                routine: "Actor@on_query".to_string(),
            }],
        };

        let text = report.to_string();
        assert!(text.starts_with("Updated host classes: Actor"));
        assert!(text.contains("Actor@on_query"));
    }

    #[test]
    fn test_empty_report() {
        assert_eq!(ExposeReport::default().to_string(), "No host classes changed\n");
    }
}
