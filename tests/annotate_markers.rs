use ngannotate::{Options, annotate};

fn run(src: &str, add: bool, remove: bool) -> String {
    let options = Options {
        add,
        remove,
        ..Options::default()
    };
    annotate(src, options).unwrap().src
}

fn add(src: &str) -> String {
    run(src, true, false)
}

#[test]
fn nginject_prologue_marks_the_function() {
    let src = r#"function Foo($scope) {
    "ngInject";
}
"#;
    let expected = r#"function Foo($scope) {
    "ngInject";
}
Foo.$inject = ["$scope"];
"#;
    assert_eq!(add(src), expected);
}

#[test]
fn ngnoinject_comment_blocks_a_match() {
    let src = r#"angular.module("MyMod").controller("MyCtrl", /*@ngNoInject*/ function($scope) {
});
"#;
    assert_eq!(add(src), src);
}

#[test]
fn ngnoinject_prologue_blocks_a_match() {
    let src = r#"angular.module("MyMod").controller("MyCtrl", function($scope) {
    "ngNoInject";
});
"#;
    assert_eq!(add(src), src);
}

#[test]
fn nginject_wrapper_call_marks_its_argument() {
    let src = r#"var foo = ngInject(function($scope) {
});
"#;
    let expected = r#"var foo = ngInject(["$scope", function($scope) {
}]);
"#;
    assert_eq!(add(src), expected);
}

#[test]
fn free_floating_nginject_comment_applies_to_next_node() {
    let src = r#"var foo = {
    // @ngInject
    bar: function($scope) {
    }
};
"#;
    let expected = r#"var foo = {
    // @ngInject
    bar: ["$scope", function($scope) {
    }]
};
"#;
    assert_eq!(add(src), expected);
}

#[test]
fn jsdoc_with_nginject_anywhere_applies() {
    let src = r#"/**
 * Sets up the thing.
 * @ngInject
 */
function Foo($scope) {
}
"#;
    let expected = r#"/**
 * Sets up the thing.
 * @ngInject
 */
function Foo($scope) {
}
Foo.$inject = ["$scope"];
"#;
    assert_eq!(add(src), expected);
}

#[test]
fn marker_applies_through_stacked_comments() {
    let src = r#"/*@ngInject*/
// sets up the controller
function Foo($scope) {
}
"#;
    let expected = r#"/*@ngInject*/
// sets up the controller
function Foo($scope) {
}
Foo.$inject = ["$scope"];
"#;
    assert_eq!(add(src), expected);
}

#[test]
fn object_marker_annotates_all_function_values() {
    let src = r#"/*@ngInject*/
var obj = {
    a: function($scope) {
    },
    b: function($http) {
    },
    sub: {
        c: function($q) {
        }
    }
};
"#;
    let expected = r#"/*@ngInject*/
var obj = {
    a: ["$scope", function($scope) {
    }],
    b: ["$http", function($http) {
    }],
    sub: {
        c: ["$q", function($q) {
        }]
    }
};
"#;
    assert_eq!(add(src), expected);
}

#[test]
fn marked_function_under_declarator_gets_named_statement() {
    let src = r#"var Foo = /*@ngInject*/ function($scope) {
};
"#;
    let expected = r#"var Foo = /*@ngInject*/ function($scope) {
};
Foo.$inject = ["$scope"];
"#;
    assert_eq!(add(src), expected);
}

#[test]
fn marked_assignment_gets_named_statement() {
    let src = r#"var obj = {};
/*@ngInject*/
obj.handler = function($scope) {
};
"#;
    let expected = r#"var obj = {};
/*@ngInject*/
obj.handler = function($scope) {
};
obj.handler.$inject = ["$scope"];
"#;
    assert_eq!(add(src), expected);
}

#[test]
fn marker_on_existing_inject_statement_retargets_next_statement() {
    let src = r#"// @ngInject
Foo.$inject = ["stale"];
function Foo($scope, $http) {
}
"#;
    let expected = r#"// @ngInject
Foo.$inject = ["$scope", "$http"];
function Foo($scope, $http) {
}
"#;
    assert_eq!(run(src, true, true), expected);
}

#[test]
fn constructor_prologue_marks_the_class() {
    let src = r#"class Foo {
    constructor($scope) {
        "ngInject";
    }
}
"#;
    let expected = r#"class Foo {
    constructor($scope) {
        "ngInject";
    }
}
Foo.$inject = ["$scope"];
"#;
    assert_eq!(add(src), expected);
}

#[test]
fn marked_static_method_gets_class_qualified_statement() {
    let src = r#"class Svc {
    /*@ngInject*/
    static config($httpProvider) {
    }

    static other(arg) {
    }
}
"#;
    let expected = r#"class Svc {
    /*@ngInject*/
    static config($httpProvider) {
    }

    static other(arg) {
    }
}
Svc.config.$inject = ["$httpProvider"];
"#;
    assert_eq!(add(src), expected);
}

#[test]
fn marked_instance_method_targets_the_prototype() {
    let src = r#"class Svc {
    /*@ngInject*/
    $get($http) {
    }

    noArgs() {
    }
}
"#;
    let expected = r#"class Svc {
    /*@ngInject*/
    $get($http) {
    }

    noArgs() {
    }
}
Svc.prototype.$get.$inject = ["$http"];
"#;
    assert_eq!(add(src), expected);
}

#[test]
fn ngnoinject_on_bound_function_blocks_reference_targets() {
    let src = r#"var Foo = /*@ngNoInject*/ function($scope) {
};
angular.module("MyMod").controller("MyCtrl", Foo);
"#;
    assert_eq!(add(src), src);
}

#[test]
fn marked_zero_parameter_function_is_untouched() {
    let src = r#"/*@ngInject*/
function Foo() {
}
"#;
    assert_eq!(add(src), src);
}
