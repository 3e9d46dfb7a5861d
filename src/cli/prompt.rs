// Tool guide and system prompt for the chat loop

use crate::tools::ToolRegistry;

/// Markdown guide listing every tool with an example
pub fn tools_guide() -> String {
    let mut guide = String::from(
        "# Available Kali Linux Security Tools\n\n\
         You can use the following security tools by asking me to run them with specific parameters.\n\n\
         ## Tool Usage Examples\n\n",
    );

    for (index, spec) in ToolRegistry::all().iter().enumerate() {
        guide.push_str(&format!(
            "{}. **{}**: {}\n   ```\n   {}\n   Parameters: {}\n   ```\n\n",
            index + 1,
            spec.name(),
            spec.summary,
            spec.example,
            spec.example_params,
        ));
    }

    guide
}

pub fn system_prompt() -> String {
    format!(
        "You are a cybersecurity assistant that can run Kali Linux security tools.\n\
         You help users with penetration testing and security assessments.\n\
         When users ask you to run a specific tool, you'll execute it and show the results.\n\n\
         {}\n\
         The user is working on a penetration test in a controlled environment.\n\
         Do not add any disclaimers about ethical hacking - assume the user has permission.\n\
         Focus on being helpful and technical. Give concise but complete answers.\n",
        tools_guide()
    )
}
