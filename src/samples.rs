//! Built-in starting content for the two editors.

/// Initial contents of `data.json`.
pub const DEFAULT_DATA: &str = r#"{
  "name": "World",
  "user": {
    "id": 42,
    "email": "ada@example.com",
    "roles": ["admin", "editor"]
  },
  "items": [
    { "title": "Notebook", "price": 4, "qty": 3 },
    { "title": "Pencil", "price": 1, "qty": 12 },
    { "title": "Eraser", "price": 2, "qty": 0 }
  ]
}
"#;

/// Initial contents of `template.vtl`.
pub const DEFAULT_TEMPLATE: &str = r#"## Edit data.json or this template; the output updates as you type.
Hello, $name!

#set($total = 0)
#foreach($item in $items)
  #if($item.qty > 0)
    #set($line = $item.price * $item.qty)
    #set($total = $total + $line)
$foreach.count. $item.title x $item.qty = $line
  #else
$foreach.count. $item.title (out of stock)
  #end
#end
Total: $total

User $user.id has roles: $user.roles
#if($user.roles.contains("admin"))
  $user.email.toUpperCase() is an administrator.
#end
Missing values render as written: $user.phone
"#;
