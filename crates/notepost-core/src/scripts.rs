//! In-page scripts used by the injector.
//!
//! Every injection script takes `(text, append)` and returns
//! `{ before, after }` with the element's content before and after the write,
//! or `{ error }` if the page rejected the attempt. The injector decides
//! success from those two snapshots, never from the script's own opinion.

use crate::dom::DomScript;

/// Current value (form fields) or rendered text (everything else).
pub const READ_CONTENT: DomScript = DomScript {
    name: "read_content",
    source: r#"function() {
  const tag = this.tagName.toLowerCase();
  return (tag === 'input' || tag === 'textarea') ? this.value : this.innerText;
}"#,
};

/// Dispatch a synthetic paste carrying `text` as `text/plain`.
///
/// Editors that handle paste in script insert at the caret; native fields
/// ignore untrusted paste events, which the injector sees as no effect.
pub const PASTE_TEXT: DomScript = DomScript {
    name: "paste_text",
    source: r#"function(text) {
  const read = () => {
    const tag = this.tagName.toLowerCase();
    return (tag === 'input' || tag === 'textarea') ? this.value : this.innerText;
  };
  try {
    const before = read();
    const data = new DataTransfer();
    data.setData('text/plain', text);
    const event = new ClipboardEvent('paste', {
      clipboardData: data,
      bubbles: true,
      cancelable: true,
    });
    const delivered = this.dispatchEvent(event);
    return { before: before, after: read(), cancelled: !delivered };
  } catch (e) {
    return { error: String(e) };
  }
}"#,
};

/// Native form field: set `value` through the prototype setter so that
/// framework value tracking sees the change, then notify.
pub const ASSIGN_PLAIN_FIELD: DomScript = DomScript {
    name: "assign_plain_field",
    source: r#"function(text, append) {
  try {
    const before = this.value;
    const proto = this.tagName.toLowerCase() === 'textarea'
      ? HTMLTextAreaElement.prototype
      : HTMLInputElement.prototype;
    const setter = Object.getOwnPropertyDescriptor(proto, 'value').set;
    this.focus();
    if (append) {
      const start = this.selectionStart ?? before.length;
      const end = this.selectionEnd ?? before.length;
      setter.call(this, before.slice(0, start) + text + before.slice(end));
    } else {
      setter.call(this, text);
    }
    this.dispatchEvent(new Event('input', { bubbles: true }));
    this.dispatchEvent(new Event('change', { bubbles: true }));
    return { before: before, after: this.value };
  } catch (e) {
    return { error: String(e) };
  }
}"#,
};

/// Rich-text editor: replace the markup with escaped lines, or insert at the
/// caret through the editing command so the editor's own model updates.
pub const ASSIGN_RICH_EDITOR: DomScript = DomScript {
    name: "assign_rich_editor",
    source: r#"function(text, append) {
  try {
    const before = this.innerText;
    this.focus();
    if (append) {
      document.execCommand('insertText', false, text);
    } else {
      const escape = (s) => s
        .replace(/&/g, '&amp;')
        .replace(/</g, '&lt;')
        .replace(/>/g, '&gt;');
      this.innerHTML = escape(text).replace(/\n/g, '<br>');
    }
    this.dispatchEvent(new Event('input', { bubbles: true }));
    this.dispatchEvent(new Event('change', { bubbles: true }));
    return { before: before, after: this.innerText };
  } catch (e) {
    return { error: String(e) };
  }
}"#,
};

/// Reactive-framework host: write the content, then dispatch an
/// `InputEvent` the framework's synthetic event layer will pick up.
pub const ASSIGN_FRAMEWORK: DomScript = DomScript {
    name: "assign_framework",
    source: r#"function(text, append) {
  try {
    const tag = this.tagName.toLowerCase();
    const isField = tag === 'input' || tag === 'textarea';
    const read = () => isField ? this.value : this.innerText;
    const before = read();
    this.focus();
    if (isField) {
      const proto = tag === 'textarea'
        ? HTMLTextAreaElement.prototype
        : HTMLInputElement.prototype;
      const setter = Object.getOwnPropertyDescriptor(proto, 'value').set;
      setter.call(this, append ? before + text : text);
    } else if (append) {
      document.execCommand('insertText', false, text);
    } else {
      this.textContent = text;
    }
    this.dispatchEvent(new InputEvent('input', {
      bubbles: true,
      cancelable: true,
      inputType: 'insertText',
      data: text,
    }));
    this.dispatchEvent(new Event('change', { bubbles: true }));
    return { before: before, after: read() };
  } catch (e) {
    return { error: String(e) };
  }
}"#,
};

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [DomScript; 5] = [
        READ_CONTENT,
        PASTE_TEXT,
        ASSIGN_PLAIN_FIELD,
        ASSIGN_RICH_EDITOR,
        ASSIGN_FRAMEWORK,
    ];

    #[test]
    fn script_names_are_unique() {
        let mut names: Vec<_> = ALL.iter().map(|s| s.name).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), ALL.len());
    }

    #[test]
    fn scripts_are_function_declarations() {
        for script in ALL {
            assert!(
                script.source.starts_with("function("),
                "{} is not a function declaration",
                script.name
            );
        }
    }

    #[test]
    fn injection_scripts_report_before_and_after() {
        for script in [PASTE_TEXT, ASSIGN_PLAIN_FIELD, ASSIGN_RICH_EDITOR, ASSIGN_FRAMEWORK] {
            assert!(script.source.contains("before:"), "{}", script.name);
            assert!(script.source.contains("after:"), "{}", script.name);
            assert!(script.source.contains("error:"), "{}", script.name);
        }
    }

    #[test]
    fn paste_uses_plain_text_transfer() {
        assert!(PASTE_TEXT.source.contains("setData('text/plain'"));
        assert!(PASTE_TEXT.source.contains("ClipboardEvent('paste'"));
    }
}
