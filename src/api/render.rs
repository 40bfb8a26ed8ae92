//! HTML for the two admin pages. Everything interpolated goes through [`escape_html`].

use std::fmt::Write;

use crate::api::common::messages::Message;
use crate::videos::repository::{DuplicateGroup, VideoPage};
use crate::videos::{Video, DB_FIELDS};

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(title: &str, messages: &[Message], body: &str) -> String {
    format!(
        r#"<!doctype html>
<html>
<head>
<meta charset="utf-8">
<title>{title}</title>
<style>
body {{ font-family: sans-serif; margin: 2em; }}
table {{ border-collapse: collapse; }}
td, th {{ border: 1px solid #ccc; padding: 4px 8px; text-align: left; }}
.messages li.info {{ color: #055160; }}
.messages li.success {{ color: #0f5132; }}
.messages li.warning {{ color: #664d03; }}
.messages li.error {{ color: #842029; }}
</style>
</head>
<body>
{messages}{body}
</body>
</html>"#,
        title = escape_html(title),
        messages = messages_html(messages),
    )
}

fn messages_html(messages: &[Message]) -> String {
    if messages.is_empty() {
        return String::new();
    }
    let mut out = String::from("<ul class=\"messages\">\n");
    for message in messages {
        let _ = writeln!(
            out,
            "<li class=\"{}\">{}</li>",
            message.level.as_str(),
            escape_html(&message.text)
        );
    }
    out.push_str("</ul>\n");
    out
}

/// What the list page shows besides the records.
pub struct ListContext<'a> {
    pub q: &'a str,
    pub selected_field: &'a str,
    pub show_duplicates: bool,
}

pub enum ListBody<'a> {
    Page(&'a VideoPage),
    Duplicates(&'a [DuplicateGroup]),
}

pub fn list_page(ctx: &ListContext<'_>, body: ListBody<'_>, messages: &[Message]) -> String {
    let mut html = String::from("<h1>Videos</h1>\n");
    html.push_str(&search_form(ctx));

    match body {
        ListBody::Page(page) => {
            let _ = writeln!(html, "<p>{} record(s)</p>", page.total);
            html.push_str(&video_table(&page.videos));
            html.push_str(&pagination(ctx, page));
        }
        ListBody::Duplicates(groups) => {
            let _ = writeln!(html, "<h2>Duplicates ({} group(s))</h2>", groups.len());
            for group in groups {
                let _ = writeln!(html, "<h3>{}</h3>", escape_html(&group.video_id));
                html.push_str(&video_table(&group.videos));
            }
        }
    }

    layout("Videos", messages, &html)
}

fn search_form(ctx: &ListContext<'_>) -> String {
    let mut options = String::new();
    for field in DB_FIELDS {
        let selected = if field == ctx.selected_field { " selected" } else { "" };
        let _ = writeln!(options, "<option value=\"{field}\"{selected}>{field}</option>");
    }
    format!(
        r#"<form method="get" action="/">
<input type="text" name="q" value="{q}">
<select name="field">
{options}</select>
<label><input type="checkbox" name="duplicates" value="1"{checked}> Show duplicates</label>
<button type="submit">Search</button>
</form>
"#,
        q = escape_html(ctx.q),
        checked = if ctx.show_duplicates { " checked" } else { "" },
    )
}

fn video_table(videos: &[Video]) -> String {
    let mut html = String::from(
        "<table>\n<tr><th>id</th><th>video_id</th><th>vid_title</th><th>name</th>\
         <th>vid_preacher</th><th>date</th><th>created_at</th><th>clicks</th><th>language</th></tr>\n",
    );
    for video in videos {
        let _ = writeln!(
            html,
            "<tr><td><a href=\"/{id}\">{id}</a></td><td>{}</td><td>{}</td><td>{}</td><td>{}</td>\
             <td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            escape_html(&video.video_id),
            escape_html(&video.vid_title),
            escape_html(&video.name),
            escape_html(&video.vid_preacher),
            escape_html(&video.date),
            escape_html(&video.created_at),
            video.clicks,
            escape_html(&video.language),
            id = video.id,
        );
    }
    html.push_str("</table>\n");
    html
}

fn page_link(ctx: &ListContext<'_>, page: i64) -> String {
    let page = page.to_string();
    let query = serde_urlencoded::to_string([
        ("q", ctx.q),
        ("field", ctx.selected_field),
        ("page", page.as_str()),
    ])
    .unwrap_or_default();
    format!("/?{}", escape_html(&query))
}

fn pagination(ctx: &ListContext<'_>, page: &VideoPage) -> String {
    let mut html = String::from("<p class=\"pagination\">");
    if page.has_previous() {
        let _ = write!(
            html,
            "<a href=\"{}\">first</a> <a href=\"{}\">previous</a> ",
            page_link(ctx, 1),
            page_link(ctx, page.page - 1)
        );
    }
    let _ = write!(html, "Page {} of {}", page.page, page.total_pages);
    if page.has_next() {
        let _ = write!(
            html,
            " <a href=\"{}\">next</a> <a href=\"{}\">last</a>",
            page_link(ctx, page.page + 1),
            page_link(ctx, page.total_pages)
        );
    }
    html.push_str("</p>\n");
    html
}

const FILE_INPUTS: [(&str, &str); 5] = [
    ("json_file", "Upload JSON"),
    ("thumb_file", "Upload Thumbnail (.jpg)"),
    ("video_file", "Replace Video (.mp4)"),
    ("audio_file", "Replace Audio (.mp3)"),
    ("vtt_file", "Upload/Replace VTT (.vtt)"),
];

const DELETE_BUTTONS: [(&str, &str); 7] = [
    ("delete_video", "Delete Video"),
    ("delete_audio", "Delete Audio"),
    ("delete_vtt", "Delete VTT"),
    ("delete_thumb", "Delete Thumbnail"),
    ("delete_json", "Delete JSON"),
    ("delete_all", "Delete All Files and Entry"),
    ("delete_db_only", "Delete Database Entry Only"),
];

pub fn edit_page(video: &Video, messages: &[Message]) -> String {
    let mut fields = String::new();
    for field in DB_FIELDS.iter().filter(|&&f| f != "id") {
        let value = escape_html(&video.field_text(field).unwrap_or_default());
        if *field == "vid_code" {
            let _ = writeln!(
                fields,
                "<p><label>{field}<br><textarea name=\"{field}\" rows=\"4\" cols=\"80\">{value}</textarea></label></p>"
            );
        } else {
            let _ = writeln!(
                fields,
                "<p><label>{field}<br><input type=\"text\" name=\"{field}\" value=\"{value}\" size=\"80\"></label></p>"
            );
        }
    }

    let mut files = String::new();
    for (name, label) in FILE_INPUTS {
        let _ = writeln!(
            files,
            "<p><label>{label}<br><input type=\"file\" name=\"{name}\"></label></p>"
        );
        match name {
            "audio_file" => files.push_str(
                "<p><label><input type=\"checkbox\" name=\"audio_delete\" value=\"true\"> Delete Audio</label></p>\n",
            ),
            "vtt_file" => files.push_str(
                "<p><label><input type=\"checkbox\" name=\"vtt_delete\" value=\"true\"> Delete VTT</label></p>\n",
            ),
            _ => {}
        }
    }

    let mut buttons = String::new();
    for (name, label) in DELETE_BUTTONS {
        let _ = writeln!(
            buttons,
            "<button type=\"submit\" name=\"{name}\" value=\"1\" formnovalidate>{label}</button>"
        );
    }

    let body = format!(
        r#"<h1>Edit video {id}</h1>
<p><a href="/">Back to list</a></p>
<form method="post" action="/{id}" enctype="multipart/form-data">
{fields}{files}<p><button type="submit">Save</button></p>
<p>{buttons}</p>
</form>
"#,
        id = video.id,
    );

    layout(&format!("Edit video {}", video.id), messages, &body)
}
