//! Static blank post template for the templates area

/// File name of the template inside the templates area
pub const TEMPLATE_FILE_NAME: &str = "post-template.md";

/// A new post with an empty header, ready to fill in by hand
pub const POST_TEMPLATE: &str = r#"---
title: ""
slug: ""
description: ""
date:
tags: []
status:
  - "draft"
---

"#;
