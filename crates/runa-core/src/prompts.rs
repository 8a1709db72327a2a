//! System prompt assembly.

use std::path::Path;

/// Fixed base prompt shared by every assembled agent.
pub const BASE_SYSTEM_PROMPT: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/prompts/base_system_prompt.md"
));

/// Generates the full system prompt for the agent.
///
/// Prepends workspace-specific path guidance (absolute root plus a concrete
/// example listing invocation) to the fixed base prompt.
pub fn system_prompt(workspace_path: &Path) -> String {
    let workspace = workspace_path.display();
    let working_dir_section = format!(
        "### File System and Paths\n\
         \n\
         **IMPORTANT - Path Handling:**\n\
         - All file paths use fully qualified absolute system paths\n\
         - The workspace root is: `{workspace}`\n\
         - Example: `{workspace}/src/main.rs`, `{workspace}/README.md`\n\
         - To list the workspace root, use `ls(\"{workspace}\")`\n\
         - Always use full absolute paths for all file operations\n\n"
    );

    working_dir_section + BASE_SYSTEM_PROMPT
}

/// Generates the filesystem-capability prompt in absolute-path terms.
pub fn filesystem_system_prompt(workspace_path: &Path) -> String {
    let workspace = workspace_path.display();
    format!(
        "You have access to a filesystem. All file paths use fully qualified absolute system paths.\n\
         \n\
         - ls: list files in a directory (e.g., ls(\"{workspace}\"))\n\
         - read_file: read a file from the filesystem\n\
         - write_file: write to a file in the filesystem\n\
         - edit_file: edit a file in the filesystem\n\
         - glob: find files matching a pattern (e.g., \"**/*.rs\")\n\
         - grep: search for text within files\n\
         \n\
         The workspace root is: {workspace}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_prompt_states_workspace_root() {
        let prompt = system_prompt(Path::new("/tmp/workspace"));
        assert!(prompt.contains("The workspace root is: `/tmp/workspace`"));
        assert!(prompt.contains("ls(\"/tmp/workspace\")"));
        // Base prompt is appended after the path guidance.
        assert!(prompt.ends_with(BASE_SYSTEM_PROMPT));
    }

    #[test]
    fn test_filesystem_prompt_lists_operations() {
        let prompt = filesystem_system_prompt(Path::new("/tmp/workspace"));
        for op in ["ls:", "read_file:", "write_file:", "edit_file:", "glob:", "grep:"] {
            assert!(prompt.contains(op), "missing operation {op}");
        }
        assert!(prompt.contains("The workspace root is: /tmp/workspace"));
    }
}
