//! Minimal server-rendered HTML pages.

use std::fmt::Write;

use actix_web::HttpResponse;
use actix_web::http::header::ContentType;

use crate::models::{Company, SessionUser, UploadRecord};

/// Escape text for use in HTML element content and quoted attributes.
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

pub fn html(body: String) -> HttpResponse {
    HttpResponse::Ok()
        .content_type(ContentType::html())
        .body(body)
}

fn layout(title: &str, user: Option<&SessionUser>, message: Option<&str>, content: &str) -> String {
    let nav = match user {
        Some(user) => format!(
            r#"<p>Signed in as {} &middot; <a href="/logout">Log out</a></p>"#,
            escape(user.profile.display_name())
        ),
        None => r#"<p><a href="/login">Log in</a></p>"#.to_string(),
    };
    let flash = message
        .filter(|m| !m.is_empty())
        .map(|m| format!(r#"<p class="message">{}</p>"#, escape(m)))
        .unwrap_or_default();

    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head><meta charset=\"utf-8\"><title>{title}</title></head>\n<body>\n<h1>{title}</h1>\n{nav}\n{flash}\n{content}\n</body>\n</html>\n",
        title = escape(title),
    )
}

pub fn home_page(user: Option<&SessionUser>, message: Option<&str>) -> String {
    let content = match user {
        Some(user) => format!(
            r#"<p>Continue to <a href="{path}">{path}</a>.</p>"#,
            path = user.principal.home_path()
        ),
        None => "<p>Log in to upload logistics files.</p>".to_string(),
    };
    layout("Logistics File Intake", user, message, &content)
}

pub fn admin_page(
    user: &SessionUser,
    message: Option<&str>,
    companies: &[Company],
    uploads: &[UploadRecord],
) -> String {
    let mut content = String::from(
        r#"<h2>Add company</h2>
<form method="post" action="/admin/add-company">
<input type="text" name="companyName" required>
<button type="submit">Add</button>
</form>
<h2>Companies</h2>
"#,
    );

    if companies.is_empty() {
        content.push_str("<p>No companies yet.</p>\n");
    } else {
        content.push_str("<ul>\n");
        for company in companies {
            let _ = writeln!(
                content,
                "<li>{} ({})</li>",
                escape(&company.company_name),
                escape(&company.company_id)
            );
        }
        content.push_str("</ul>\n");
    }

    content.push_str("<h2>Recent uploads</h2>\n");
    if uploads.is_empty() {
        content.push_str("<p>No uploads yet.</p>\n");
    } else {
        content.push_str(
            "<table>\n<tr><th>File</th><th>Company</th><th>Uploaded by</th><th>Time</th><th>Status</th></tr>\n",
        );
        for upload in uploads {
            let _ = writeln!(
                content,
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                escape(&upload.data),
                escape(&upload.company_id),
                escape(&upload.uploaded_by),
                escape(&upload.timestamp),
                escape(&upload.status)
            );
        }
        content.push_str("</table>\n");
    }

    layout("Admin", Some(user), message, &content)
}

pub fn client_page(user: &SessionUser, message: Option<&str>, companies: &[Company]) -> String {
    let mut options = String::from("<option value=\"\">Select a company</option>\n");
    for company in companies {
        let _ = writeln!(
            options,
            r#"<option value="{}">{}</option>"#,
            escape(&company.company_id),
            escape(&company.company_name)
        );
    }

    let content = format!(
        r#"<form method="post" action="/upload" enctype="multipart/form-data">
<select id="company" name="company">
{options}</select>
<input type="file" name="excelFile" accept=".xlsx,.xls">
<button type="submit">Upload</button>
</form>
<h2>Files</h2>
<div id="fileList"><p>Please select a company to view files.</p></div>"#
    );

    layout("Upload", Some(user), message, &content)
}
