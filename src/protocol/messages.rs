//! Wire lines of the chat protocol
//!
//! Every byte sequence the server ever writes to a client is either one of
//! these constants or produced by one of these rendering helpers, so the
//! exact wire format lives in a single place.

/// Greeting written to every connection as soon as it is accepted
pub const WELCOME_LINE: &str = "WELCOME ON OUR SERVER!\n";

/// Prefix a client uses to register its login
pub const LOGIN_PREFIX: &str = "login:";

/// Sender label for server-authored broadcasts
pub const SERVER_LABEL: &str = "SERVER";

/// Escape-bracket terminator written after a duplicate-login rejection.
/// Sent without a trailing newline; it is a hint for interactive (telnet)
/// clients, not a framed protocol line.
pub const DISCONNECT_HINT: &str = "^]";

/// Rejection for a first line that is not a `login:` attempt
pub const INVALID_LOGIN_LINE: &str = "Invalid login. Please, register new login\n";

/// Render a broadcast line: `{label} >  {content}\n` (two spaces after `>`)
pub fn render_message(label: &str, content: &str) -> String {
    format!("{} >  {}\n", label, content)
}

/// Render the login confirmation line
pub fn render_hello(login: &str) -> String {
    format!("Hello {}!\n", login)
}

/// Render the duplicate-login rejection line
pub fn render_login_taken(login: &str) -> String {
    format!("Invalid login. {} already using!\n", login)
}

/// Content of the server broadcast announcing a new participant
pub fn connected_content(login: &str) -> String {
    format!("User {} - connected to chat!", login)
}

/// Content of the server broadcast announcing a departure
pub fn left_content(login: &str) -> String {
    format!("User {} - left the server!", login)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_message() {
        assert_eq!(render_message("alice", "hi"), "alice >  hi\n");
        assert_eq!(
            render_message(SERVER_LABEL, "maintenance"),
            "SERVER >  maintenance\n"
        );
    }

    #[test]
    fn test_render_empty_content() {
        assert_eq!(render_message("alice", ""), "alice >  \n");
    }

    #[test]
    fn test_login_lines() {
        assert_eq!(render_hello("alice"), "Hello alice!\n");
        assert_eq!(
            render_login_taken("alice"),
            "Invalid login. alice already using!\n"
        );
    }

    #[test]
    fn test_server_announcements() {
        assert_eq!(
            render_message(SERVER_LABEL, &connected_content("alice")),
            "SERVER >  User alice - connected to chat!\n"
        );
        assert_eq!(
            render_message(SERVER_LABEL, &left_content("alice")),
            "SERVER >  User alice - left the server!\n"
        );
    }
}
