//! Prints the automation script generated for a dummy device, which is
//! handy when adjusting the template or the escaping rules.

use edgeprobe::device::SSH_VERIFY_COMMAND;
use edgeprobe::templates;

fn main() {
    let script = templates::render_login_script(
        "admin",
        "192.0.2.10",
        r#"p@$s"w[o{rd"#,
        SSH_VERIFY_COMMAND,
    );
    print!("{script}");
}
