//! OpenStep-style property list printer for `project.pbxproj`.

use std::collections::BTreeMap;
use std::fmt;

use super::objects::{ObjectArena, ObjectRef, RemoteTarget, Value};

const HEADER: &str = "// !$*UTF8*$!\n";

/// Classes printed on a single line.
const SINGLE_LINE: [&str; 2] = ["PBXBuildFile", "PBXFileReference"];

/// Quote `s` unless it is made only of characters Xcode leaves bare.
///
/// ```
/// use projgen::xcode::quote;
///
/// assert_eq!(quote("main.cc"), "main.cc");
/// assert_eq!(quote("<group>"), "\"<group>\"");
/// assert_eq!(quote(""), "\"\"");
/// assert_eq!(quote("a\"b\n"), "\"a\\\"b\\n\"");
/// ```
#[must_use]
pub fn quote(s: &str) -> String {
    let bare = !s.is_empty()
        && !s.contains("___")
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '$' | '_' | '.' | '/'));
    if bare {
        return s.to_owned();
    }
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}

/// Serialises one arena whose ids have been computed.
pub struct Printer<'a, R> {
    arena: &'a ObjectArena,
    resolve: R,
}

impl<'a, R> Printer<'a, R>
where
    R: Fn(&RemoteTarget) -> Option<String>,
{
    /// Printer for `arena`; `resolve` supplies ids of remote targets.
    pub const fn new(arena: &'a ObjectArena, resolve: R) -> Self {
        Self { arena, resolve }
    }

    fn id(&self, r: ObjectRef) -> &str {
        self.arena.id(r).unwrap_or("")
    }

    /// Print the whole file with `root` as `rootObject`.
    ///
    /// # Errors
    ///
    /// Returns the first remote target that could not be resolved.
    pub fn print(&self, root: ObjectRef) -> Result<String, RemoteTarget> {
        let mut out = String::from(HEADER);
        self.write_file(&mut out, root).map_err(|err| match err {
            PrintError::Unresolved(target) => target,
        })?;
        Ok(out)
    }

    fn write_file(&self, out: &mut String, root: ObjectRef) -> Result<(), PrintError> {
        out.push_str("{\n\tarchiveVersion = 1;\n\tclasses = {\n\t};\n\tobjectVersion = 45;\n\tobjects = {\n");
        let mut sections: BTreeMap<&str, Vec<(&str, ObjectRef)>> = BTreeMap::new();
        for (r, object) in self.arena.iter() {
            sections.entry(object.isa).or_default().push((self.id(r), r));
        }
        for (isa, mut members) in sections {
            members.sort_unstable();
            push_fmt(out, format_args!("\n/* Begin {isa} section */\n"));
            for (_, r) in members {
                self.write_object(out, r, isa)?;
            }
            push_fmt(out, format_args!("/* End {isa} section */\n"));
        }
        out.push_str("\t};\n");
        push_fmt(
            out,
            format_args!("\trootObject = {} /* {} */;\n}}\n", self.id(root), self.arena.comment(root)),
        );
        Ok(())
    }

    fn write_object(&self, out: &mut String, r: ObjectRef, isa: &str) -> Result<(), PrintError> {
        let Some(object) = self.arena.get(r) else {
            return Ok(());
        };
        let single = SINGLE_LINE.contains(&isa);
        push_fmt(out, format_args!("\t\t{} /* {} */ = {{", self.id(r), self.arena.comment(r)));
        let mut props: Vec<(&str, &Value)> = object.props.iter().map(|(k, v)| (k.as_str(), v)).collect();
        props.sort_by_key(|(k, _)| *k);
        if single {
            push_fmt(out, format_args!("isa = {isa}; "));
            for (key, value) in props {
                push_fmt(out, format_args!("{} = ", quote(key)));
                self.write_value(out, value, None)?;
                out.push_str("; ");
            }
            out.push_str("};\n");
        } else {
            push_fmt(out, format_args!("\n\t\t\tisa = {isa};\n"));
            for (key, value) in props {
                push_fmt(out, format_args!("\t\t\t{} = ", quote(key)));
                self.write_value(out, value, Some(3))?;
                out.push_str(";\n");
            }
            out.push_str("\t\t};\n");
        }
        Ok(())
    }

    /// `indent` is the depth of the line holding the value, or `None` when
    /// printing on a single line.
    fn write_value(&self, out: &mut String, value: &Value, indent: Option<usize>) -> Result<(), PrintError> {
        match value {
            Value::Str(s) => out.push_str(&quote(s)),
            Value::Ref(r) => push_fmt(out, format_args!("{} /* {} */", self.id(*r), self.arena.comment(*r))),
            Value::Remote(target) => {
                let id = (self.resolve)(target).ok_or_else(|| PrintError::Unresolved(target.clone()))?;
                out.push_str(&id);
            }
            Value::List(items) => {
                out.push('(');
                for item in items {
                    match indent {
                        Some(depth) => {
                            out.push('\n');
                            push_tabs(out, depth + 1);
                            self.write_value(out, item, Some(depth + 1))?;
                            out.push(',');
                        }
                        None => {
                            self.write_value(out, item, None)?;
                            out.push_str(", ");
                        }
                    }
                }
                if let Some(depth) = indent {
                    out.push('\n');
                    push_tabs(out, depth);
                }
                out.push(')');
            }
            Value::Dict(entries) => {
                out.push('{');
                let mut keys: Vec<&String> = entries.keys().collect();
                keys.sort();
                for key in keys {
                    let Some(item) = entries.get(key) else {
                        continue;
                    };
                    match indent {
                        Some(depth) => {
                            out.push('\n');
                            push_tabs(out, depth + 1);
                            push_fmt(out, format_args!("{} = ", quote(key)));
                            self.write_value(out, item, Some(depth + 1))?;
                            out.push(';');
                        }
                        None => {
                            push_fmt(out, format_args!("{} = ", quote(key)));
                            self.write_value(out, item, None)?;
                            out.push_str("; ");
                        }
                    }
                }
                if let Some(depth) = indent {
                    out.push('\n');
                    push_tabs(out, depth);
                }
                out.push('}');
            }
        }
        Ok(())
    }
}

enum PrintError {
    Unresolved(RemoteTarget),
}

fn push_tabs(out: &mut String, depth: usize) {
    out.extend(std::iter::repeat_n('\t', depth));
}

fn push_fmt(out: &mut String, args: fmt::Arguments<'_>) {
    out.push_str(&fmt::format(args));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xcode::RemoteObject;
    use rstest::rstest;

    #[rstest]
    #[case("Source", "Source")]
    #[case("$(SRCROOT)/a_b.h", "\"$(SRCROOT)/a_b.h\"")]
    #[case("sourcecode.cpp.cpp", "sourcecode.cpp.cpp")]
    #[case("Run \"t\"", "\"Run \\\"t\\\"\"")]
    #[case("a___b", "\"a___b\"")]
    fn quoting(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(quote(raw), expected);
    }

    #[test]
    fn prints_sections_in_class_order() {
        let mut arena = ObjectArena::new();
        let project = arena.add("PBXProject", None, ["p"]);
        let group = arena.add("PBXGroup", Some(project), ["Source"]);
        arena.set(group, "name", "Source");
        arena.set(group, "sourceTree", "<group>");
        let file = arena.add("PBXFileReference", Some(group), ["a.cc"]);
        arena.set(file, "path", "a.cc");
        arena.set(file, "sourceTree", "<group>");
        arena.append(group, "children", file);
        arena.set(project, "mainGroup", group);
        arena.compute_ids();

        let text = Printer::new(&arena, |_| None).print(project).expect("print");
        let id = |r| arena.id(r).unwrap_or_default().to_owned();
        let expected = format!(
            concat!(
                "// !$*UTF8*$!\n",
                "{{\n",
                "\tarchiveVersion = 1;\n",
                "\tclasses = {{\n",
                "\t}};\n",
                "\tobjectVersion = 45;\n",
                "\tobjects = {{\n",
                "\n/* Begin PBXFileReference section */\n",
                "\t\t{file} /* a.cc */ = {{isa = PBXFileReference; path = a.cc; sourceTree = \"<group>\"; }};\n",
                "/* End PBXFileReference section */\n",
                "\n/* Begin PBXGroup section */\n",
                "\t\t{group} /* Source */ = {{\n",
                "\t\t\tisa = PBXGroup;\n",
                "\t\t\tchildren = (\n",
                "\t\t\t\t{file} /* a.cc */,\n",
                "\t\t\t);\n",
                "\t\t\tname = Source;\n",
                "\t\t\tsourceTree = \"<group>\";\n",
                "\t\t}};\n",
                "/* End PBXGroup section */\n",
                "\n/* Begin PBXProject section */\n",
                "\t\t{project} /* Project object */ = {{\n",
                "\t\t\tisa = PBXProject;\n",
                "\t\t\tmainGroup = {group} /* Source */;\n",
                "\t\t}};\n",
                "/* End PBXProject section */\n",
                "\t}};\n",
                "\trootObject = {project} /* Project object */;\n",
                "}}\n",
            ),
            file = id(file),
            group = id(group),
            project = id(project),
        );
        assert_eq!(text, expected);
    }

    #[test]
    fn unresolved_remote_targets_are_reported() {
        let mut arena = ObjectArena::new();
        let proxy = arena.add("PBXContainerItemProxy", None, ["other"]);
        let remote = RemoteTarget {
            build_file: "b/b.gyp".into(),
            target_name: "b".into(),
            object: RemoteObject::Target,
        };
        arena.set(proxy, "remoteGlobalIDString", Value::Remote(remote.clone()));
        arena.compute_ids();
        let err = Printer::new(&arena, |_| None).print(proxy).expect_err("unresolved");
        assert_eq!(err, remote);
        let text = Printer::new(&arena, |_| Some("ABC".to_owned()))
            .print(proxy)
            .expect("resolved");
        assert!(text.contains("remoteGlobalIDString = ABC;"));
    }
}
