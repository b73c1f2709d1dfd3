//! Markup for the [`View`] descriptions produced by `server_api::render`.

use std::fmt::Write as _;

use server_api::{
    view::{DateField, EntryView, LoginView, SelectField, TextField},
    Flash, FlashKind, View,
};

const STYLE: &str = "body{font-family:sans-serif;max-width:40rem;margin:2rem auto;padding:0 1rem}\
label{display:block;margin-top:1rem;font-weight:bold}\
input,select{width:100%;padding:.4rem;margin-top:.25rem}\
button{margin-top:1.5rem;padding:.5rem 1.5rem}\
.flash{padding:.75rem;margin:1rem 0;border-radius:.25rem}\
.success{background:#e6f4ea}.warning{background:#fff4e5}.error{background:#fdecea}\
.help{color:#666;font-size:.85rem}.who{display:flex;justify-content:space-between}";

pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn render_page(view: &View) -> String {
    let (title, body) = match view {
        View::Login(login) => (login.title, login_body(login)),
        View::Entry(entry) => (entry.title, entry_body(entry)),
    };
    format!(
        "<!DOCTYPE html>\n<html lang=\"pt-BR\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{title}</title>\n<style>{STYLE}</style>\n</head>\n<body>\n<h1>{title}</h1>\n{body}</body>\n</html>\n",
        title = escape(title),
    )
}

fn login_body(view: &LoginView) -> String {
    let mut out = String::new();
    push_flash(&mut out, view.flash.as_ref());
    out.push_str("<form method=\"post\" action=\"/login\">\n");
    push_text(&mut out, &view.name);
    push_select(&mut out, &view.unit, false);
    out.push_str("<button type=\"submit\">Entrar</button>\n</form>\n");
    out
}

fn entry_body(view: &EntryView) -> String {
    let mut out = String::new();
    let _ = write!(
        out,
        "<div class=\"who\"><span>Usuário: {} | Unidade: {}</span>\
         <form method=\"post\" action=\"/logout\"><button type=\"submit\">Sair</button></form></div>\n",
        escape(&view.user_name),
        escape(&view.organizational_unit),
    );
    push_flash(&mut out, view.flash.as_ref());

    // Every select change re-renders the page through a GET of the whole form.
    out.push_str("<form method=\"get\" action=\"/\">\n");
    push_select(&mut out, &view.organization, true);
    if let Some(allocation) = &view.allocation {
        push_select(&mut out, allocation, true);
    }
    if let Some(sequence) = &view.sequence {
        push_select(&mut out, sequence, true);
    }
    if let Some(value) = &view.value {
        push_text(&mut out, value);
    }
    if let Some(date) = &view.date {
        push_date(&mut out, date);
    }
    if view.can_submit() {
        out.push_str(
            "<button type=\"submit\" formmethod=\"post\" formaction=\"/submit\">Enviar</button>\n",
        );
    }
    out.push_str("</form>\n");
    out
}

fn push_flash(out: &mut String, flash: Option<&Flash>) {
    let Some(flash) = flash else {
        return;
    };
    let class = match flash.kind {
        FlashKind::Success => "success",
        FlashKind::Warning => "warning",
        FlashKind::Error => "error",
    };
    let _ = writeln!(
        out,
        "<div class=\"flash {class}\" role=\"status\">{}</div>",
        escape(&flash.message)
    );
}

fn push_select(out: &mut String, field: &SelectField, submit_on_change: bool) {
    let on_change = if submit_on_change {
        " onchange=\"this.form.submit()\""
    } else {
        ""
    };
    let _ = writeln!(
        out,
        "<label for=\"{name}\">{label}</label>\n<select id=\"{name}\" name=\"{name}\"{on_change}>",
        name = field.name,
        label = escape(field.label),
    );
    if field.include_blank {
        let selected = if field.selected.is_none() { " selected" } else { "" };
        let _ = writeln!(out, "<option value=\"\"{selected}></option>");
    }
    for option in &field.options {
        let selected = if field.selected.as_deref() == Some(option.as_str()) {
            " selected"
        } else {
            ""
        };
        let _ = writeln!(
            out,
            "<option value=\"{value}\"{selected}>{value}</option>",
            value = escape(option),
        );
    }
    out.push_str("</select>\n");
}

fn push_text(out: &mut String, field: &TextField) {
    let _ = writeln!(
        out,
        "<label for=\"{name}\">{label}</label>\n<input type=\"text\" id=\"{name}\" name=\"{name}\" value=\"{value}\">",
        name = field.name,
        label = escape(field.label),
        value = escape(&field.value),
    );
    if let Some(help) = field.help {
        let _ = writeln!(out, "<div class=\"help\">{}</div>", escape(help));
    }
}

fn push_date(out: &mut String, field: &DateField) {
    let _ = writeln!(
        out,
        "<label for=\"{name}\">{label}</label>\n<input type=\"date\" id=\"{name}\" name=\"{name}\" value=\"{value}\">",
        name = field.name,
        label = escape(field.label),
        value = field.value.format("%Y-%m-%d"),
    );
}

#[cfg(test)]
#[path = "tests/html_tests.rs"]
mod tests;
