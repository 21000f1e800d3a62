#![allow(dead_code)]

use std::path::Path;

pub const CONFIG: &str = r#"
languages = ["en"]
allowed_groups = ["sysop"]

[pages]
list = "Project:List"
ranking_main_article = "Project:Ranking/Articles"
ranking_main_image = "Project:Ranking/Images"
ranking_category_article = "Project:Ranking/%(category)s/Articles"
ranking_category_image = "Project:Ranking/%(category)s/Images"

[limits]
main_article = 50
main_image = 10
category_article = 50
category_image = 10

[templates]
list_record = ["Wiki list record", "%(visible)s", "code = %(code)s", "display = %(display)s", "address = %(address)s", "categories = %(categories)s", "articles = %(articles)s", "images = %(images)s", "users = %(users)s", "admins = %(admins)s"]
category_record = ["Category record", "%(name)s", "articles = %(articles)s", "artcount = %(artcount)s", "images = %(images)s", "imgcount = %(imgcount)s"]
ranking_record = ["Ranking record", "%(place)s", "%(move)s", "%(count)s", "code = %(code)s", "name = %(name)s"]

[tags]
list = { start = "<!-- LIST START -->", end = "<!-- LIST END -->" }
categories = { start = "<!-- CATS START -->", end = "<!-- CATS END -->" }
talk = { start = "<!-- QUEUE START -->", end = "<!-- QUEUE END -->" }
ranking_columns = [{ start = "<!-- COL1 -->", end = "<!-- /COL1 -->" }]

[edit_restriction.list]
once = "week"
days = [1, 2, 3, 4, 5, 6, 7]

[edit_restriction.ranking]
once = "week"
days = [1, 2, 3, 4, 5, 6, 7]
"#;

pub const USERS: &str = r#"
[groups]
Admin = ["sysop"]
"#;

pub const LIST_PAGE: &str = r#"
title = "Project:List"

[[revisions]]
id = 10
timestamp = "2015-05-28T09:30:00Z"
author = "Admin"
summary = "adding a wiki"
text = '''
== Wikis ==
<!-- LIST START -->
{{Wiki list record | Alpha Wiki
| code = alpha
| display =
| address = http://alpha.wikia.com/
| categories = games
| articles = 100
| images = 30
| users = 4
| admins = 2
}}
{{Wiki list record | Beta Wiki
| code = beta
| display =
| address = http://beta.wikia.com/
| categories =
| articles = 70
| images = 12
| users = 2
| admins = 1
}}
<!-- LIST END -->
== Categories ==
<!-- CATS START -->
{{Category record | Games
| articles = 0
| artcount = 0
| images = 0
| imgcount = 0
}}
<!-- CATS END -->
Footer stays untouched.
'''
"#;

pub const RANKING_PAGE: &str = r#"
title = "Project:Ranking/Articles"

[[revisions]]
id = 30
timestamp = "2015-05-28T09:30:00Z"
author = "Someone"
summary = "manual tweak"
text = '''
Counting <span id="licznik">2</span> wikis as of <span id="data">28 May 2015</span>.
<!-- COL1 -->
{{Ranking record | 1   | ** |     100
| code = alpha
| name = Alpha Wiki
}}
{{Ranking record | 2   | ** |      70
| code = beta
| name = Beta Wiki
}}
<!-- /COL1 -->
Footer stays untouched.
'''
"#;

pub const ALPHA: &str = r#"
code = "alpha"
name = "Alpha Wiki"
address = "http://alpha.wikia.com"
language = "en"
articles = 120
images = 40
active_users = 5
active_admins = 2
"#;

pub const BETA: &str = r#"
code = "beta"
name = "Beta Wiki"
address = "http://beta.wikia.com"
language = "en"
articles = 80
images = 15
active_users = 3
active_admins = 1
"#;

/// Lay out a complete site directory: config, users, the list page, one
/// single-column article ranking, and two entities.
pub fn write_site(root: &Path) {
	std::fs::create_dir_all(root.join("pages")).unwrap();
	std::fs::create_dir_all(root.join("entities")).unwrap();

	std::fs::write(root.join("rankbot.toml"), CONFIG).unwrap();
	std::fs::write(root.join("users.toml"), USERS).unwrap();
	std::fs::write(root.join("pages").join("list.toml"), LIST_PAGE).unwrap();
	std::fs::write(root.join("pages").join("ranking_articles.toml"), RANKING_PAGE).unwrap();
	std::fs::write(root.join("entities").join("alpha.toml"), ALPHA).unwrap();
	std::fs::write(root.join("entities").join("beta.toml"), BETA).unwrap();
}
