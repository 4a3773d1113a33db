//! Resources compiled into the binary, served when `static_files.unpacked` is off.

#[derive(Debug)]
pub struct Asset {
    pub path: &'static str,
    pub content_type: &'static str,
    pub bytes: &'static [u8],
}

static ASSETS: &[Asset] = &[
    Asset {
        path: "/static/admin/admin.html",
        content_type: "text/html; charset=utf-8",
        bytes: include_bytes!(concat!(env!("CARGO_MANIFEST_DIR"), "/static/admin/admin.html")),
    },
    Asset {
        path: "/static/favicon.ico",
        content_type: "image/x-icon",
        bytes: include_bytes!(concat!(env!("CARGO_MANIFEST_DIR"), "/static/favicon.ico")),
    },
];

pub fn lookup(path: &str) -> Option<&'static Asset> {
    ASSETS.iter().find(|asset| asset.path == path)
}
