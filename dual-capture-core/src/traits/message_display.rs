/// Message-display capability used by the UI shell (dialogs, console, ...).
pub trait MessageDisplay {
    fn show_info(&self, title: &str, message: &str);

    fn show_error(&self, title: &str, message: &str);
}
